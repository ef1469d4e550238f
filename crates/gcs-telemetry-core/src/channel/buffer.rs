//! Per-vehicle windowed buffer
//!
//! Holds the live channels of one vehicle under shared limits.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{ChannelLimits, Sample, SampleChannel};
use crate::error::TelemetryError;
use crate::vehicle::VehicleId;

/// Bounded set of sample channels for one vehicle
#[derive(Debug, Clone)]
pub struct WindowedBuffer {
    /// Vehicle the channels belong to
    vehicle: VehicleId,
    /// Channels keyed by name
    channels: BTreeMap<String, SampleChannel>,
    /// Limits applied to every channel
    limits: ChannelLimits,
}

impl WindowedBuffer {
    /// Create a buffer with one empty channel per name
    pub fn new<I, S>(vehicle: VehicleId, names: I, limits: ChannelLimits) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                (name.clone(), SampleChannel::new(name, limits))
            })
            .collect();

        Self {
            vehicle,
            channels,
            limits,
        }
    }

    /// Vehicle the buffer belongs to
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Limits applied to every channel
    pub fn limits(&self) -> ChannelLimits {
        self.limits
    }

    /// Channel names, sorted
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Check whether a channel exists
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Borrow a channel
    pub fn channel(&self, name: &str) -> Option<&SampleChannel> {
        self.channels.get(name)
    }

    /// Append a sample to a channel
    pub fn append(&mut self, channel: &str, sample: Sample) -> Result<(), TelemetryError> {
        self.channels
            .get_mut(channel)
            .ok_or_else(|| TelemetryError::UnknownChannel(channel.to_string()))?
            .append(sample)
    }

    /// Samples of a channel with `from <= timestamp <= to`
    pub fn view(
        &self,
        channel: &str,
        from: Duration,
        to: Duration,
    ) -> Result<Vec<Sample>, TelemetryError> {
        Ok(self.get(channel)?.view(from, to))
    }

    /// Trailing window of a channel ending at its newest sample
    pub fn latest_window(
        &self,
        channel: &str,
        window: Duration,
    ) -> Result<Vec<Sample>, TelemetryError> {
        Ok(self.get(channel)?.latest_window(window))
    }

    /// Newest sample of a channel
    pub fn latest(&self, channel: &str) -> Option<&Sample> {
        self.channels.get(channel).and_then(SampleChannel::last)
    }

    /// Number of samples in a channel (0 for unknown channels)
    pub fn len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, SampleChannel::len)
    }

    /// Total samples across all channels
    pub fn total_samples(&self) -> usize {
        self.channels.values().map(SampleChannel::len).sum()
    }

    /// Check if every channel is empty
    pub fn is_empty(&self) -> bool {
        self.channels.values().all(SampleChannel::is_empty)
    }

    /// Apply new limits to every channel
    pub fn set_limits(&mut self, limits: ChannelLimits) {
        self.limits = limits;
        for channel in self.channels.values_mut() {
            channel.set_limits(limits);
        }
    }

    /// Empty every channel, keeping the channel set
    pub fn clear(&mut self) {
        for channel in self.channels.values_mut() {
            channel.clear();
        }
    }

    fn get(&self, channel: &str) -> Result<&SampleChannel, TelemetryError> {
        self.channels
            .get(channel)
            .ok_or_else(|| TelemetryError::UnknownChannel(channel.to_string()))
    }
}
