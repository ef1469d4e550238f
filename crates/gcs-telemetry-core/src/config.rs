//! Engine Configuration
//!
//! Channel definitions, buffer limits, display window and cadence settings.
//! Every field has a default, so a partial JSON document is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::channel::{ChannelLimits, DEFAULT_MAX_SAMPLES};
use crate::error::ConfigError;
use crate::vehicle::{FieldSource, VehicleId};

/// Default live retention (5 minutes)
pub const DEFAULT_RETENTION_MS: u64 = 300_000;

/// Runtime retention bounds (1 minute to 1 hour)
pub const MIN_RETENTION: Duration = Duration::from_secs(60);
/// Upper runtime retention bound
pub const MAX_RETENTION: Duration = Duration::from_secs(3600);

/// Default chart window (60 seconds)
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Default chart polling rate in Hz
pub const DEFAULT_CHART_HZ: f64 = 25.0;

/// Default system-health polling rate in Hz
pub const DEFAULT_HEALTH_HZ: f64 = 1.0;

/// Allowed polling rates in Hz
pub const MIN_RATE_HZ: f64 = 1.0;
/// Fastest allowed polling rate in Hz
pub const MAX_RATE_HZ: f64 = 200.0;

/// Live data older than this is flagged stale
pub const DEFAULT_STALE_AFTER_MS: u64 = 2000;

/// Default playback speed multiplier
pub const DEFAULT_PLAYBACK_SPEED: f64 = 2.0;

/// One output field of a channel and where its value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name in produced samples
    pub name: String,
    /// State field the value is read from
    pub source: FieldSource,
}

impl FieldMapping {
    /// Map `source` to the sample field `name`
    pub fn new(name: impl Into<String>, source: FieldSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Definition of one data channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Channel name used in views
    pub name: String,
    /// Fields of every sample
    pub fields: Vec<FieldMapping>,
    /// Vehicles this channel is recorded for. Empty means all vehicles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vehicles: Vec<VehicleId>,
}

impl ChannelSpec {
    /// Create a channel recorded for every vehicle
    pub fn new(name: impl Into<String>, fields: Vec<FieldMapping>) -> Self {
        Self {
            name: name.into(),
            fields,
            vehicles: Vec::new(),
        }
    }

    /// Restrict the channel to the given vehicles
    pub fn only_for(mut self, vehicles: &[VehicleId]) -> Self {
        self.vehicles = vehicles.to_vec();
        self
    }

    /// Check whether the channel is recorded for a vehicle
    pub fn applies_to(&self, vehicle: VehicleId) -> bool {
        self.vehicles.is_empty() || self.vehicles.contains(&vehicle)
    }
}

/// Polling cadences the caller should drive the ingestor at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRates {
    /// Chart data rate in Hz
    pub chart_hz: f64,
    /// System health rate in Hz
    pub health_hz: f64,
}

impl UpdateRates {
    /// Clamp a rate into the supported range. NaN maps to the minimum.
    pub fn clamp_rate(hz: f64) -> f64 {
        if hz.is_nan() {
            return MIN_RATE_HZ;
        }
        hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
    }

    /// Interval between chart polls
    pub fn chart_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / Self::clamp_rate(self.chart_hz))
    }

    /// Interval between health polls
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / Self::clamp_rate(self.health_hz))
    }
}

impl Default for UpdateRates {
    fn default() -> Self {
        Self {
            chart_hz: DEFAULT_CHART_HZ,
            health_hz: DEFAULT_HEALTH_HZ,
        }
    }
}

/// Telemetry engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Channels recorded in live mode
    pub channels: Vec<ChannelSpec>,
    /// Maximum samples per live channel
    pub max_samples: usize,
    /// Maximum time span per live channel in milliseconds
    pub retention_ms: u64,
    /// Default display window in milliseconds
    pub window_ms: u64,
    /// Polling cadences
    pub rates: UpdateRates,
    /// Live staleness threshold in milliseconds
    pub stale_after_ms: u64,
    /// Playback speed a fresh controller starts with
    pub default_speed: f64,
    /// Vehicle selected on startup
    pub initial_vehicle: VehicleId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            max_samples: DEFAULT_MAX_SAMPLES,
            retention_ms: DEFAULT_RETENTION_MS,
            window_ms: DEFAULT_WINDOW_MS,
            rates: UpdateRates::default(),
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            default_speed: DEFAULT_PLAYBACK_SPEED,
            initial_vehicle: VehicleId::Uav1,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_samples == 0 {
            return Err(ConfigError::Invalid("max_samples must be at least 1".into()));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::Invalid("window_ms must be positive".into()));
        }
        if !(self.default_speed.is_finite() && self.default_speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_speed must be a positive number, got {}",
                self.default_speed
            )));
        }

        let mut names = HashSet::new();
        for spec in &self.channels {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid("channel name must not be empty".into()));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate channel '{}'",
                    spec.name
                )));
            }
            if spec.fields.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "channel '{}' has no fields",
                    spec.name
                )));
            }
            let mut fields = HashSet::new();
            for field in &spec.fields {
                if !fields.insert(field.name.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate field '{}' in channel '{}'",
                        field.name, spec.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Live channel limits
    pub fn limits(&self) -> ChannelLimits {
        ChannelLimits::new(self.max_samples, Duration::from_millis(self.retention_ms))
    }

    /// Default display window
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Live staleness threshold
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    /// Channels recorded for a vehicle
    pub fn channels_for(&self, vehicle: VehicleId) -> impl Iterator<Item = &ChannelSpec> {
        self.channels.iter().filter(move |c| c.applies_to(vehicle))
    }

    /// Look up a channel definition by name
    pub fn channel(&self, name: &str) -> Option<&ChannelSpec> {
        self.channels.iter().find(|c| c.name == name)
    }
}

/// Attitude, RC input, motion and altitude channels, recorded for every vehicle.
///
/// Ground vehicles report no altitude, so their altitude channel reads 0.
pub fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new(
            "attitude",
            vec![
                FieldMapping::new("roll", FieldSource::RollDeg),
                FieldMapping::new("pitch", FieldSource::PitchDeg),
                FieldMapping::new("yaw", FieldSource::YawDeg),
            ],
        ),
        ChannelSpec::new(
            "rc",
            vec![
                FieldMapping::new("throttle", FieldSource::RcThrottle),
                FieldMapping::new("roll", FieldSource::RcRoll),
                FieldMapping::new("pitch", FieldSource::RcPitch),
                FieldMapping::new("yaw", FieldSource::RcYaw),
            ],
        ),
        ChannelSpec::new(
            "motion",
            vec![
                FieldMapping::new("groundSpeed", FieldSource::GroundSpeed),
                FieldMapping::new("throttle", FieldSource::RcThrottle),
            ],
        ),
        ChannelSpec::new(
            "altitude",
            vec![FieldMapping::new("altitude", FieldSource::Altitude)],
        ),
    ]
}
