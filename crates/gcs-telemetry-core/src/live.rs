//! Live ingestion
//!
//! Turns vehicle state snapshots into per-channel samples. The ingestor never
//! schedules anything itself: the caller decides how often to poll or forward
//! pushes, and passes the sample time in with every update.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{trace, warn};

use crate::channel::{ChannelLimits, Sample, WindowedBuffer};
use crate::config::{ChannelSpec, EngineConfig, UpdateRates};
use crate::error::TelemetryError;
use crate::vehicle::{StatesResponse, TelemetryPush, VehicleId, VehicleState};

/// Why an update was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IgnoreReason {
    /// The update belongs to a vehicle that is not selected
    OtherVehicle {
        /// Vehicle the ingestor records
        expected: VehicleId,
        /// Vehicle named by the update
        actual: VehicleId,
    },
    /// The engine is in playback mode
    NotLive,
    /// A poll response did not contain the selected vehicle
    MissingVehicle,
    /// A poll response reported `success: false`
    Unsuccessful,
}

/// Result of feeding one update to the ingestor
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Samples were derived; some channels may have rejected theirs
    Applied {
        /// Channels that took a sample
        appended: usize,
        /// Why the other channels refused theirs
        rejected: Vec<TelemetryError>,
    },
    /// Nothing was recorded
    Ignored(IgnoreReason),
}

impl IngestOutcome {
    /// Check whether the update reached the buffers
    pub fn is_applied(&self) -> bool {
        matches!(self, IngestOutcome::Applied { .. })
    }
}

/// Running counters for one ingestor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Updates applied
    pub updates: u64,
    /// Samples appended across all channels
    pub appended: u64,
    /// Samples rejected across all channels
    pub rejected: u64,
    /// Updates ignored
    pub ignored: u64,
}

/// Live-mode ingestor for one vehicle
#[derive(Debug, Clone)]
pub struct LiveIngestor {
    vehicle: VehicleId,
    /// Channel definitions that apply to `vehicle`
    specs: Vec<ChannelSpec>,
    buffer: WindowedBuffer,
    rates: UpdateRates,
    stale_after: Duration,
    /// Time of the last applied update
    last_update: Option<Duration>,
    /// Staleness flag reported by the backend on the last update
    backend_stale: bool,
    stats: IngestStats,
}

impl LiveIngestor {
    /// Create an empty ingestor for a vehicle
    pub fn new(vehicle: VehicleId, config: &EngineConfig) -> Self {
        let specs: Vec<ChannelSpec> = config.channels_for(vehicle).cloned().collect();
        let buffer = WindowedBuffer::new(vehicle, specs.iter().map(|s| s.name.clone()), config.limits());

        Self {
            vehicle,
            specs,
            buffer,
            rates: config.rates,
            stale_after: config.stale_after(),
            last_update: None,
            backend_stale: false,
            stats: IngestStats::default(),
        }
    }

    /// Vehicle this ingestor records
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Live buffers
    pub fn buffer(&self) -> &WindowedBuffer {
        &self.buffer
    }

    /// Recorded channel names, in configuration order
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// Counters
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Time of the last applied update
    pub fn last_update(&self) -> Option<Duration> {
        self.last_update
    }

    /// Record one state snapshot taken at `now`
    pub fn on_state_update(
        &mut self,
        vehicle: VehicleId,
        state: &VehicleState,
        now: Duration,
    ) -> IngestOutcome {
        if vehicle != self.vehicle {
            trace!(expected = %self.vehicle, actual = %vehicle, "Ignoring update for other vehicle");
            return self.ignore(IgnoreReason::OtherVehicle {
                expected: self.vehicle,
                actual: vehicle,
            });
        }

        let mut appended = 0;
        let mut rejected = Vec::new();

        for spec in &self.specs {
            let sample = derive_sample(spec, state, now);
            match self.buffer.append(&spec.name, sample) {
                Ok(()) => appended += 1,
                Err(e) => {
                    warn!(vehicle = %self.vehicle, "Dropping live sample: {e}");
                    rejected.push(e);
                }
            }
        }

        self.stats.updates += 1;
        self.stats.appended += appended as u64;
        self.stats.rejected += rejected.len() as u64;
        self.last_update = Some(self.last_update.map_or(now, |last| last.max(now)));
        self.backend_stale = state.data_stale;

        IngestOutcome::Applied { appended, rejected }
    }

    /// Record a socket push message
    pub fn on_push(&mut self, push: &TelemetryPush, now: Duration) -> IngestOutcome {
        self.on_state_update(push.vehicle_id, &push.state, now)
    }

    /// Record this vehicle's entry of a poll response
    pub fn on_states_snapshot(&mut self, snapshot: &StatesResponse, now: Duration) -> IngestOutcome {
        if !snapshot.success {
            return self.ignore(IgnoreReason::Unsuccessful);
        }
        match snapshot.data.get(&self.vehicle) {
            Some(state) => self.on_state_update(self.vehicle, state, now),
            None => self.ignore(IgnoreReason::MissingVehicle),
        }
    }

    /// Check whether live data is missing or too old at `now`
    pub fn is_stale(&self, now: Duration) -> bool {
        match self.last_update {
            Some(last) => self.backend_stale || now.saturating_sub(last) > self.stale_after,
            None => true,
        }
    }

    /// Polling cadences
    pub fn rates(&self) -> UpdateRates {
        self.rates
    }

    /// Set the chart polling rate (clamped to the supported range).
    ///
    /// Only the interval reported to the caller changes; buffered samples are
    /// left untouched.
    pub fn set_update_rate(&mut self, hz: f64) {
        self.rates.chart_hz = UpdateRates::clamp_rate(hz);
    }

    /// Set the system-health polling rate (clamped to the supported range)
    pub fn set_health_rate(&mut self, hz: f64) {
        self.rates.health_hz = UpdateRates::clamp_rate(hz);
    }

    /// Interval at which the caller should poll chart data
    pub fn poll_interval(&self) -> Duration {
        self.rates.chart_interval()
    }

    /// Apply new buffer limits, evicting immediately
    pub fn set_limits(&mut self, limits: ChannelLimits) {
        self.buffer.set_limits(limits);
    }

    fn ignore(&mut self, reason: IgnoreReason) -> IngestOutcome {
        self.stats.ignored += 1;
        IngestOutcome::Ignored(reason)
    }
}

/// Build one channel's sample from a state snapshot. Absent fields read as 0.
fn derive_sample(spec: &ChannelSpec, state: &VehicleState, now: Duration) -> Sample {
    let fields: BTreeMap<String, f64> = spec
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.source.read(state).unwrap_or(0.0)))
        .collect();
    Sample::new(now, fields)
}
