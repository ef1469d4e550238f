//! Sample Channels
//!
//! Bounded, time-ordered series of telemetry samples. The same channel type
//! backs live buffers and historical records, so a window sliced from either
//! one is produced by the same code.

mod buffer;

pub use buffer::WindowedBuffer;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crate::error::TelemetryError;

/// Default maximum samples kept per live channel
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Default retention span for live channels (5 minutes)
pub const DEFAULT_MAX_SPAN: Duration = Duration::from_secs(300);

/// A single timestamped observation of one or more numeric fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Sample time. Live: caller clock. Playback: offset from record start.
    timestamp: Duration,
    /// Field values keyed by field name
    fields: BTreeMap<String, f64>,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: Duration, fields: BTreeMap<String, f64>) -> Self {
        Self { timestamp, fields }
    }

    /// Create a sample from `(name, value)` pairs
    pub fn from_pairs<K, I>(timestamp: Duration, pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let fields = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { timestamp, fields }
    }

    /// Sample time
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// All field values
    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    /// Value of one field
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }
}

/// Size and age bounds for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLimits {
    /// Maximum number of samples retained
    pub max_samples: usize,
    /// Maximum `newest - oldest` timestamp distance retained
    pub max_span: Duration,
}

impl ChannelLimits {
    /// Create limits. `max_samples` is raised to at least 1.
    pub fn new(max_samples: usize, max_span: Duration) -> Self {
        Self {
            max_samples: max_samples.max(1),
            max_span,
        }
    }

    /// Limits that never evict. Used for immutable historical records.
    pub fn unbounded() -> Self {
        Self {
            max_samples: usize::MAX,
            max_span: Duration::MAX,
        }
    }
}

impl Default for ChannelLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES, DEFAULT_MAX_SPAN)
    }
}

/// Bounds of a trailing window of length `window` ending at `to`
pub fn trailing_window(to: Duration, window: Duration) -> (Duration, Duration) {
    (to.saturating_sub(window), to)
}

/// A named time series of samples, ordered by timestamp
#[derive(Debug, Clone)]
pub struct SampleChannel {
    name: String,
    samples: VecDeque<Sample>,
    limits: ChannelLimits,
}

impl SampleChannel {
    /// Create an empty channel
    pub fn new(name: impl Into<String>, limits: ChannelLimits) -> Self {
        Self {
            name: name.into(),
            samples: VecDeque::new(),
            limits,
        }
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current limits
    pub fn limits(&self) -> ChannelLimits {
        self.limits
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest sample
    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// Newest sample
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate over all samples in order
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Timestamp distance between newest and oldest sample
    pub fn span(&self) -> Duration {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => Duration::ZERO,
        }
    }

    /// Append a sample, evicting from the front to honor the limits.
    ///
    /// A sample older than the newest one is rejected and the channel is left
    /// untouched. Equal timestamps are accepted.
    pub fn append(&mut self, sample: Sample) -> Result<(), TelemetryError> {
        if let Some(last) = self.samples.back() {
            if sample.timestamp < last.timestamp {
                return Err(TelemetryError::OutOfOrderSample {
                    channel: self.name.clone(),
                    timestamp: sample.timestamp,
                    last: last.timestamp,
                });
            }
        }

        self.samples.push_back(sample);
        self.evict();
        Ok(())
    }

    /// Replace the limits and evict immediately
    pub fn set_limits(&mut self, limits: ChannelLimits) {
        self.limits = limits;
        self.evict();
    }

    /// Remove all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples with `from <= timestamp <= to`, in order.
    ///
    /// An empty or inverted range yields an empty vector.
    pub fn view(&self, from: Duration, to: Duration) -> Vec<Sample> {
        if from > to {
            return Vec::new();
        }
        let start = self.samples.partition_point(|s| s.timestamp < from);
        let end = self.samples.partition_point(|s| s.timestamp <= to);
        if start >= end {
            return Vec::new();
        }
        self.samples.range(start..end).cloned().collect()
    }

    /// Trailing window of length `window` ending at the newest sample
    pub fn latest_window(&self, window: Duration) -> Vec<Sample> {
        match self.samples.back() {
            Some(last) => {
                let (from, to) = trailing_window(last.timestamp, window);
                self.view(from, to)
            }
            None => Vec::new(),
        }
    }

    fn evict(&mut self) {
        while self.samples.len() > self.limits.max_samples {
            self.samples.pop_front();
        }
        while self.samples.len() >= 2 && self.span() > self.limits.max_span {
            self.samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(t: u64, v: f64) -> Sample {
        Sample::from_pairs(Duration::from_secs(t), [("x", v)])
    }

    #[test]
    fn test_max_samples_eviction() {
        let mut ch = SampleChannel::new("x", ChannelLimits::new(3, Duration::MAX));
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            ch.append(x(t, v)).unwrap();
        }

        let view = ch.view(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(view, vec![x(2, 20.0), x(3, 30.0), x(4, 40.0)]);
    }

    #[test]
    fn test_max_span_eviction() {
        let mut ch = SampleChannel::new("x", ChannelLimits::new(100, Duration::from_secs(5)));
        for t in 0..=10 {
            ch.append(x(t, t as f64)).unwrap();
        }

        assert_eq!(ch.first().unwrap().timestamp(), Duration::from_secs(5));
        assert_eq!(ch.span(), Duration::from_secs(5));
        assert_eq!(ch.len(), 6);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut ch = SampleChannel::new("x", ChannelLimits::default());
        ch.append(x(5, 1.0)).unwrap();

        let err = ch.append(x(4, 2.0)).unwrap_err();
        assert!(matches!(err, TelemetryError::OutOfOrderSample { .. }));
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.last().unwrap().get("x"), Some(1.0));
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let mut ch = SampleChannel::new("x", ChannelLimits::default());
        ch.append(x(1, 1.0)).unwrap();
        ch.append(x(1, 2.0)).unwrap();
        assert_eq!(ch.len(), 2);
    }

    #[test]
    fn test_view_inclusive_and_empty() {
        let mut ch = SampleChannel::new("x", ChannelLimits::default());
        for t in [1, 2, 3, 4] {
            ch.append(x(t, 0.0)).unwrap();
        }

        assert_eq!(ch.view(Duration::from_secs(2), Duration::from_secs(3)).len(), 2);
        assert!(ch.view(Duration::from_secs(5), Duration::from_secs(9)).is_empty());
        assert!(ch.view(Duration::from_secs(3), Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn test_latest_window() {
        let mut ch = SampleChannel::new("x", ChannelLimits::default());
        for t in 0..=20 {
            ch.append(x(t, 0.0)).unwrap();
        }
        let view = ch.latest_window(Duration::from_secs(5));
        assert_eq!(view.first().unwrap().timestamp(), Duration::from_secs(15));
        assert_eq!(view.len(), 6);
    }

    #[test]
    fn test_shrinking_limits_evicts() {
        let mut ch = SampleChannel::new("x", ChannelLimits::default());
        for t in 0..10 {
            ch.append(x(t, 0.0)).unwrap();
        }
        ch.set_limits(ChannelLimits::new(4, Duration::MAX));
        assert_eq!(ch.len(), 4);
        assert_eq!(ch.first().unwrap().timestamp(), Duration::from_secs(6));
    }
}
