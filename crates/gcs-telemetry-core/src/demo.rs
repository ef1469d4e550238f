//! Demo Mode - Synthetic telemetry for testing without vehicles
//!
//! Nothing here is used implicitly. A failed history fetch is always reported
//! as such; a caller that wants to show demo data instead must load it
//! explicitly, and the resulting record is flagged `synthetic`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::playback::{HistoryPoint, HistoryResponse};
use crate::vehicle::{VehicleId, VehicleKind, VehicleState};

/// Simulated vehicle producing live state snapshots
pub struct DemoVehicle {
    vehicle: VehicleId,
    state: VehicleState,
    rng: StdRng,
}

impl DemoVehicle {
    /// Create a simulator with a random seed
    pub fn new(vehicle: VehicleId) -> Self {
        Self::with_rng(vehicle, StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn with_seed(vehicle: VehicleId, seed: u64) -> Self {
        Self::with_rng(vehicle, StdRng::seed_from_u64(seed))
    }

    fn with_rng(vehicle: VehicleId, rng: StdRng) -> Self {
        let mut state = VehicleState {
            vehicle_id: Some(vehicle),
            kind: Some(vehicle.kind()),
            ..VehicleState::default()
        };
        state.attitude.roll_deg = Some(0.0);
        state.attitude.pitch_deg = Some(0.0);
        state.attitude.yaw_deg = Some(0.0);
        state.position.altitude = Some(0.0);
        state.battery.voltage = Some(if vehicle.kind() == VehicleKind::Uav { 15.4 } else { 14.8 });
        state.battery.percent = Some(80.0);

        Self { vehicle, state, rng }
    }

    /// Simulated vehicle
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Advance the simulation to `elapsed_ms` and return the new state
    pub fn update(&mut self, elapsed_ms: u64) -> VehicleState {
        let t = elapsed_ms as f64 / 1000.0;
        let rng = &mut self.rng;
        let s = &mut self.state;

        match self.vehicle.kind() {
            VehicleKind::Uav => {
                s.attitude.roll_deg = Some(t.sin() * 30.0);
                s.attitude.pitch_deg = Some(t.cos() * 20.0);
                s.attitude.yaw_deg = Some((t * 10.0) % 360.0);
                s.position.altitude = Some(10.0 + (t / 10.0).sin() * 5.0);
                s.motion.ground_speed = Some(5.0 + rng.gen_range(0.0..1.0));
                s.motion.vertical_speed = Some((t / 10.0).cos() * 0.5);
                s.rc.throttle = Some(0.5 + t.sin() * 0.2);
                s.rc.roll = Some(0.0);
                s.rc.pitch = Some(0.0);
                s.rc.yaw = Some(0.0);
            }
            VehicleKind::Ugv => {
                // Random walk within +/-45 deg, yaw wraps
                let roll = s.attitude.roll_deg.unwrap_or(0.0) + rng.gen_range(-0.2..0.2);
                let pitch = s.attitude.pitch_deg.unwrap_or(0.0) + rng.gen_range(-0.2..0.2);
                let yaw = s.attitude.yaw_deg.unwrap_or(0.0) + rng.gen_range(-1.0..1.0);
                s.attitude.roll_deg = Some(roll.clamp(-45.0, 45.0));
                s.attitude.pitch_deg = Some(pitch.clamp(-45.0, 45.0));
                s.attitude.yaw_deg = Some(yaw.rem_euclid(360.0));
                s.motion.ground_speed = Some(rng.gen_range(0.0..2.0));
                s.motion.vertical_speed = Some(0.0);
                s.rc.throttle = Some(rng.gen_range(0.0..0.5));
                s.rc.roll = Some(rng.gen_range(-0.3..0.3));
                s.rc.pitch = Some(rng.gen_range(-0.1..0.1));
                s.rc.yaw = Some(rng.gen_range(-0.2..0.2));
            }
        }

        // Slow discharge, 1% per minute
        s.battery.percent = Some((80.0 - t / 60.0).max(0.0));
        s.timestamp = Some(t);
        s.clone()
    }
}

/// Parameters of a generated history record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoHistory {
    /// Record length in seconds
    pub seconds: u32,
    /// Points per second per channel
    pub rate_hz: u32,
    /// Epoch seconds of the first point
    pub start_time: f64,
    /// Seed of the ground-speed noise
    pub seed: u64,
}

impl Default for DemoHistory {
    fn default() -> Self {
        Self {
            seconds: 60,
            rate_hz: 10,
            start_time: 0.0,
            seed: 0,
        }
    }
}

impl DemoHistory {
    /// Number of intervals in the record, saturating at `u32::MAX`
    pub fn intervals(&self) -> u32 {
        self.seconds.saturating_mul(self.rate_hz.max(1))
    }

    /// Generate a history response flagged as synthetic
    pub fn generate(&self, vehicle: VehicleId) -> HistoryResponse {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let rate = self.rate_hz.max(1);
        let count = self.intervals();
        let aerial = vehicle.kind() == VehicleKind::Uav;

        let mut attitude = Vec::new();
        let mut rc = Vec::new();
        let mut motion = Vec::new();
        let mut altitude = Vec::new();

        for i in 0..=count {
            let t = i as f64 / rate as f64;
            let timestamp = self.start_time + t;

            attitude.push(point(
                timestamp,
                [
                    ("roll", t.sin() * 30.0),
                    ("pitch", t.cos() * 20.0),
                    ("yaw", t % 360.0),
                ],
            ));
            let throttle = 0.5 + t.sin() * 0.2;
            rc.push(point(
                timestamp,
                [("throttle", throttle), ("roll", 0.0), ("pitch", 0.0), ("yaw", 0.0)],
            ));
            motion.push(point(
                timestamp,
                [("groundSpeed", 5.0 + rng.gen_range(0.0..1.0)), ("throttle", 0.5)],
            ));
            // Ground vehicles sit at 0
            let alt = if aerial { 10.0 + (t / 10.0).sin() * 5.0 } else { 0.0 };
            altitude.push(point(timestamp, [("altitude", alt)]));
        }

        let data = BTreeMap::from([
            ("attitude".to_string(), attitude),
            ("rc".to_string(), rc),
            ("motion".to_string(), motion),
            ("altitude".to_string(), altitude),
        ]);

        HistoryResponse {
            success: true,
            data: Some(data),
            start_time: self.start_time,
            end_time: self.start_time + self.seconds as f64,
            duration: self.seconds as f64,
            error: None,
            synthetic: true,
        }
    }
}

fn point<const N: usize>(timestamp: f64, fields: [(&str, f64); N]) -> HistoryPoint {
    HistoryPoint {
        timestamp,
        fields: fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
            .collect(),
    }
}
