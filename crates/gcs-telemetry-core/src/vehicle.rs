//! Vehicle identity and live state schema
//!
//! Declares the shape of the state objects delivered by the backend for each
//! vehicle. Every numeric field is optional: a field missing from a payload is
//! read back as `None` here and filled with `0.0` by the ingestor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The two vehicles managed by the ground station
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum VehicleId {
    /// Aerial vehicle
    #[default]
    #[serde(rename = "UAV1")]
    Uav1,
    /// Ground vehicle
    #[serde(rename = "UGV1")]
    Ugv1,
}

impl VehicleId {
    /// All vehicles, in display order
    pub const ALL: [VehicleId; 2] = [VehicleId::Uav1, VehicleId::Ugv1];

    /// Wire identifier used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleId::Uav1 => "UAV1",
            VehicleId::Ugv1 => "UGV1",
        }
    }

    /// Vehicle class
    pub fn kind(&self) -> VehicleKind {
        match self {
            VehicleId::Uav1 => VehicleKind::Uav,
            VehicleId::Ugv1 => VehicleKind::Ugv,
        }
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    /// Unmanned aerial vehicle
    Uav,
    /// Unmanned ground vehicle
    Ugv,
}

/// GPS receiver status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gps {
    /// Fix type (0 none, 2 2D, 3 3D)
    pub fix: Option<f64>,
    /// Satellites in view
    pub satellites: Option<f64>,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
}

/// Battery status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Battery {
    /// Pack voltage in volts
    pub voltage: Option<f64>,
    /// Remaining charge in percent
    pub percent: Option<f64>,
    /// Estimated minutes left
    pub remaining_min: Option<f64>,
    /// Set while on a charger
    pub charging: Option<bool>,
}

/// Global position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    /// Latitude in degrees
    pub lat: Option<f64>,
    /// Longitude in degrees
    pub lon: Option<f64>,
    /// Altitude in meters
    pub altitude: Option<f64>,
}

/// Attitude in degrees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attitude {
    /// Roll
    pub roll_deg: Option<f64>,
    /// Pitch
    pub pitch_deg: Option<f64>,
    /// Heading, 0-360
    pub yaw_deg: Option<f64>,
}

/// Normalized RC stick input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RcInput {
    /// Throttle, 0 to 1
    pub throttle: Option<f64>,
    /// Roll stick, -1 to 1
    pub roll: Option<f64>,
    /// Pitch stick, -1 to 1
    pub pitch: Option<f64>,
    /// Yaw stick, -1 to 1
    pub yaw: Option<f64>,
}

/// Velocity in m/s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Motion {
    /// Horizontal speed
    pub ground_speed: Option<f64>,
    /// Climb rate, positive up
    pub vertical_speed: Option<f64>,
}

/// Radio/data link quality
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkHealth {
    /// Heartbeat rate seen by the backend
    pub heartbeat_hz: Option<f64>,
    /// Round-trip latency
    pub latency_ms: Option<f64>,
    /// Lost packets in percent
    pub packet_loss_percent: Option<f64>,
    /// Transport name (e.g. "serial", "udp")
    pub link_type: Option<String>,
}

/// Companion computer load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemHealth {
    /// CPU load in percent
    pub cpu: Option<f64>,
    /// Memory use in percent
    pub memory: Option<f64>,
    /// SoC temperature in degrees Celsius
    pub temperature: Option<f64>,
}

/// Full state snapshot for one vehicle as delivered by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleState {
    /// Vehicle the snapshot belongs to
    pub vehicle_id: Option<VehicleId>,
    /// Vehicle class, `type` on the wire
    #[serde(rename = "type")]
    pub kind: Option<VehicleKind>,
    /// Backend timestamp (epoch seconds)
    pub timestamp: Option<f64>,
    /// Motors armed
    pub armed: bool,
    /// Flight/drive mode name (e.g. "RTL", "HOLD")
    pub mode: Option<String>,
    /// GPS status
    pub gps: Gps,
    /// Battery status
    pub battery: Battery,
    /// Global position
    pub position: Position,
    /// Attitude
    pub attitude: Attitude,
    /// RC input
    pub rc: RcInput,
    /// Velocity
    pub motion: Motion,
    /// Link quality
    pub link_health: LinkHealth,
    /// Companion computer load
    pub system_health: SystemHealth,
    /// Backend has not heard from the vehicle recently
    pub data_stale: bool,
}

impl VehicleState {
    /// Parse a state object from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read one numeric field
    pub fn field(&self, source: FieldSource) -> Option<f64> {
        source.read(self)
    }
}

/// Push message emitted by the backend for every state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPush {
    /// Source vehicle
    pub vehicle_id: VehicleId,
    /// Full state after the change
    pub state: VehicleState,
}

/// Poll response carrying the state of every vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatesResponse {
    /// Backend reported success
    pub success: bool,
    /// State per vehicle
    pub data: HashMap<VehicleId, VehicleState>,
    /// Backend time of the snapshot (epoch seconds)
    pub timestamp: Option<f64>,
}

/// A numeric field of [`VehicleState`], addressed by its dotted wire path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSource {
    /// `attitude.rollDeg`
    #[serde(rename = "attitude.rollDeg")]
    RollDeg,
    /// `attitude.pitchDeg`
    #[serde(rename = "attitude.pitchDeg")]
    PitchDeg,
    /// `attitude.yawDeg`
    #[serde(rename = "attitude.yawDeg")]
    YawDeg,
    /// `rc.throttle`
    #[serde(rename = "rc.throttle")]
    RcThrottle,
    /// `rc.roll`
    #[serde(rename = "rc.roll")]
    RcRoll,
    /// `rc.pitch`
    #[serde(rename = "rc.pitch")]
    RcPitch,
    /// `rc.yaw`
    #[serde(rename = "rc.yaw")]
    RcYaw,
    /// `motion.groundSpeed`
    #[serde(rename = "motion.groundSpeed")]
    GroundSpeed,
    /// `motion.verticalSpeed`
    #[serde(rename = "motion.verticalSpeed")]
    VerticalSpeed,
    /// `position.lat`
    #[serde(rename = "position.lat")]
    Latitude,
    /// `position.lon`
    #[serde(rename = "position.lon")]
    Longitude,
    /// `position.altitude`
    #[serde(rename = "position.altitude")]
    Altitude,
    /// `battery.voltage`
    #[serde(rename = "battery.voltage")]
    BatteryVoltage,
    /// `battery.percent`
    #[serde(rename = "battery.percent")]
    BatteryPercent,
    /// `battery.remainingMin`
    #[serde(rename = "battery.remainingMin")]
    BatteryRemainingMin,
    /// `gps.fix`
    #[serde(rename = "gps.fix")]
    GpsFix,
    /// `gps.satellites`
    #[serde(rename = "gps.satellites")]
    GpsSatellites,
    /// `gps.hdop`
    #[serde(rename = "gps.hdop")]
    GpsHdop,
    /// `linkHealth.heartbeatHz`
    #[serde(rename = "linkHealth.heartbeatHz")]
    HeartbeatHz,
    /// `linkHealth.latencyMs`
    #[serde(rename = "linkHealth.latencyMs")]
    LatencyMs,
    /// `linkHealth.packetLossPercent`
    #[serde(rename = "linkHealth.packetLossPercent")]
    PacketLossPercent,
    /// `systemHealth.cpu`
    #[serde(rename = "systemHealth.cpu")]
    Cpu,
    /// `systemHealth.memory`
    #[serde(rename = "systemHealth.memory")]
    Memory,
    /// `systemHealth.temperature`
    #[serde(rename = "systemHealth.temperature")]
    Temperature,
    /// `1.0` when armed, `0.0` otherwise
    #[serde(rename = "armed")]
    Armed,
}

impl FieldSource {
    /// Extract this field from a state snapshot
    pub fn read(&self, state: &VehicleState) -> Option<f64> {
        match self {
            FieldSource::RollDeg => state.attitude.roll_deg,
            FieldSource::PitchDeg => state.attitude.pitch_deg,
            FieldSource::YawDeg => state.attitude.yaw_deg,
            FieldSource::RcThrottle => state.rc.throttle,
            FieldSource::RcRoll => state.rc.roll,
            FieldSource::RcPitch => state.rc.pitch,
            FieldSource::RcYaw => state.rc.yaw,
            FieldSource::GroundSpeed => state.motion.ground_speed,
            FieldSource::VerticalSpeed => state.motion.vertical_speed,
            FieldSource::Latitude => state.position.lat,
            FieldSource::Longitude => state.position.lon,
            FieldSource::Altitude => state.position.altitude,
            FieldSource::BatteryVoltage => state.battery.voltage,
            FieldSource::BatteryPercent => state.battery.percent,
            FieldSource::BatteryRemainingMin => state.battery.remaining_min,
            FieldSource::GpsFix => state.gps.fix,
            FieldSource::GpsSatellites => state.gps.satellites,
            FieldSource::GpsHdop => state.gps.hdop,
            FieldSource::HeartbeatHz => state.link_health.heartbeat_hz,
            FieldSource::LatencyMs => state.link_health.latency_ms,
            FieldSource::PacketLossPercent => state.link_health.packet_loss_percent,
            FieldSource::Cpu => state.system_health.cpu,
            FieldSource::Memory => state.system_health.memory,
            FieldSource::Temperature => state.system_health.temperature,
            FieldSource::Armed => Some(if state.armed { 1.0 } else { 0.0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vehicle_is_uav() {
        assert_eq!(VehicleId::default(), VehicleId::Uav1);
        assert_eq!(VehicleState::default().vehicle_id, None);
    }

    #[test]
    fn test_parse_partial_state() {
        let json = r#"{
            "vehicleId": "UAV1",
            "type": "uav",
            "armed": true,
            "attitude": {"rollDeg": -2.3, "pitchDeg": 1.1},
            "rc": {"throttle": 0.55},
            "chargeStatus": {"charging": false, "chargeVoltage": null}
        }"#;
        let state = VehicleState::from_json(json).unwrap();

        assert_eq!(state.vehicle_id, Some(VehicleId::Uav1));
        assert_eq!(state.kind, Some(VehicleKind::Uav));
        assert_eq!(state.field(FieldSource::RollDeg), Some(-2.3));
        assert_eq!(state.field(FieldSource::YawDeg), None);
        assert_eq!(state.field(FieldSource::RcThrottle), Some(0.55));
        assert_eq!(state.field(FieldSource::Armed), Some(1.0));
    }

    #[test]
    fn test_integer_fields_read_as_float() {
        let state = VehicleState::from_json(r#"{"gps": {"fix": 3, "satellites": 14}}"#).unwrap();
        assert_eq!(state.field(FieldSource::GpsSatellites), Some(14.0));
    }

    #[test]
    fn test_field_source_wire_names() {
        let src: FieldSource = serde_json::from_str("\"position.altitude\"").unwrap();
        assert_eq!(src, FieldSource::Altitude);
        assert_eq!(
            serde_json::to_string(&FieldSource::GroundSpeed).unwrap(),
            "\"motion.groundSpeed\""
        );
    }

    #[test]
    fn test_states_response_keys() {
        let json = r#"{"success": true, "data": {"UGV1": {"mode": "HOLD"}}, "timestamp": 1.5}"#;
        let resp: StatesResponse = serde_json::from_str(json).unwrap();
        assert!(resp.data.contains_key(&VehicleId::Ugv1));
        assert_eq!(resp.data[&VehicleId::Ugv1].mode.as_deref(), Some("HOLD"));
    }
}
