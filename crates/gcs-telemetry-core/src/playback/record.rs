//! Historical records
//!
//! A record is fetched once per playback activation and never modified
//! afterwards. Sample timestamps are rebased so that `0` is the record start,
//! which makes a sample timestamp directly comparable to a clock offset.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use crate::channel::{ChannelLimits, Sample, SampleChannel};
use crate::error::TelemetryError;
use crate::vehicle::VehicleId;

/// One historical point as delivered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Epoch seconds
    pub timestamp: f64,
    /// Every other key of the point
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Payload of the full-history endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryResponse {
    /// Backend reported success
    pub success: bool,
    /// Points per channel, oldest first
    pub data: Option<BTreeMap<String, Vec<HistoryPoint>>>,
    /// Epoch seconds of the earliest point
    pub start_time: f64,
    /// Epoch seconds of the latest point
    pub end_time: f64,
    /// Record length in seconds
    pub duration: f64,
    /// Failure reason when `success` is false
    pub error: Option<String>,
    /// Set when the data was generated rather than recorded
    pub synthetic: bool,
}

impl HistoryResponse {
    /// Parse a response from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Immutable, pre-fetched history of one vehicle
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    vehicle: VehicleId,
    /// Epoch seconds
    start_time: f64,
    end_time: f64,
    duration: Duration,
    synthetic: bool,
    channels: BTreeMap<String, SampleChannel>,
    /// Points dropped while building the record
    dropped: usize,
}

impl HistoricalRecord {
    /// Build a record from a backend response.
    ///
    /// Fails with `HistoryUnavailable` when the backend reported failure or
    /// sent no data. Points that are out of order or precede `startTime` are
    /// dropped and counted.
    pub fn from_response(
        vehicle: VehicleId,
        response: HistoryResponse,
    ) -> Result<Self, TelemetryError> {
        let unavailable = |reason: String| TelemetryError::HistoryUnavailable { vehicle, reason };

        if !response.success {
            return Err(unavailable(
                response
                    .error
                    .unwrap_or_else(|| "backend reported failure".to_string()),
            ));
        }
        let data = response
            .data
            .ok_or_else(|| unavailable("response carried no data".to_string()))?;
        if !response.start_time.is_finite() || !response.end_time.is_finite() {
            return Err(unavailable("record bounds are not finite".to_string()));
        }

        let duration_secs = if response.duration.is_finite() && response.duration >= 0.0 {
            response.duration
        } else {
            (response.end_time - response.start_time).max(0.0)
        };
        let duration = Duration::try_from_secs_f64(duration_secs)
            .map_err(|e| unavailable(format!("invalid duration: {e}")))?;

        let mut channels = BTreeMap::new();
        let mut dropped = 0;

        for (name, points) in data {
            let mut channel = SampleChannel::new(name.clone(), ChannelLimits::unbounded());
            for point in points {
                let Some(timestamp) = rebase(point.timestamp, response.start_time) else {
                    dropped += 1;
                    continue;
                };
                let fields = point
                    .fields
                    .iter()
                    .filter_map(|(k, v)| numeric(v).map(|n| (k.clone(), n)))
                    .collect();
                if channel.append(Sample::new(timestamp, fields)).is_err() {
                    dropped += 1;
                }
            }
            channels.insert(name, channel);
        }

        if dropped > 0 {
            warn!(%vehicle, dropped, "Dropped unusable points from historical record");
        }

        Ok(Self {
            vehicle,
            start_time: response.start_time,
            end_time: response.end_time,
            duration,
            synthetic: response.synthetic,
            channels,
            dropped,
        })
    }

    /// Vehicle the record belongs to
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Record length
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Epoch seconds of the record start
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Epoch seconds of the record end
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Check if the record was generated rather than recorded
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Number of points dropped while building the record
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Borrow a channel
    pub fn channel(&self, name: &str) -> Option<&SampleChannel> {
        self.channels.get(name)
    }

    /// Channel names, sorted
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Wall-clock time of the record start
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.start_time * 1000.0).round() as i64)
    }

    /// Wall-clock time at a playback offset
    pub fn absolute_time(&self, offset: Duration) -> Option<DateTime<Utc>> {
        let delta = TimeDelta::from_std(offset).ok()?;
        self.started_at()?.checked_add_signed(delta)
    }
}

/// Convert epoch seconds into an offset from `start`, at microsecond resolution
fn rebase(timestamp: f64, start: f64) -> Option<Duration> {
    let relative = timestamp - start;
    if !relative.is_finite() || relative < 0.0 {
        return None;
    }
    Some(Duration::from_micros((relative * 1_000_000.0).round() as u64))
}

/// Numbers are taken as-is, `null` reads as 0 and anything else is skipped
fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::Null => Some(0.0),
        _ => None,
    }
}
