//! Playback controller
//!
//! State machine: `Idle -> Loading -> Ready -> {Playing, Paused} -> Ended`.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{HistoricalRecord, HistoryResponse, PlaybackState, VirtualClock};
use crate::channel::trailing_window;
use crate::config::EngineConfig;
use crate::engine::CurrentView;
use crate::error::TelemetryError;
use crate::vehicle::VehicleId;

/// Plays back the history of one vehicle
#[derive(Debug, Clone)]
pub struct PlaybackController {
    vehicle: VehicleId,
    state: PlaybackState,
    record: Option<HistoricalRecord>,
    clock: VirtualClock,
    /// Configured channels, viewable (empty) even when the record lacks them
    expected_channels: Vec<String>,
    /// Last load failure, cleared by a successful load
    last_error: Option<TelemetryError>,
}

impl PlaybackController {
    /// Create an idle controller
    pub fn new(vehicle: VehicleId, config: &EngineConfig) -> Self {
        Self {
            vehicle,
            state: PlaybackState::Idle,
            record: None,
            clock: VirtualClock::new(Duration::ZERO, config.default_speed),
            expected_channels: config.channels_for(vehicle).map(|c| c.name.clone()).collect(),
            last_error: None,
        }
    }

    /// Vehicle being played back
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Lifecycle state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Playback clock
    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Loaded record, if any
    pub fn record(&self) -> Option<&HistoricalRecord> {
        self.record.as_ref()
    }

    /// Last load failure
    pub fn last_error(&self) -> Option<&TelemetryError> {
        self.last_error.as_ref()
    }

    /// Enter `Loading`. Only allowed from `Idle`.
    pub fn begin_loading(&mut self) -> Result<(), TelemetryError> {
        match self.state {
            PlaybackState::Idle => {
                self.state = PlaybackState::Loading;
                debug!(vehicle = %self.vehicle, "Loading history");
                Ok(())
            }
            PlaybackState::Loading => Err(TelemetryError::FetchInProgress),
            other => Err(TelemetryError::FetchNotAllowed(other)),
        }
    }

    /// Resolve the outstanding fetch.
    ///
    /// Success moves to `Ready` at offset 0. Any failure returns to `Idle`
    /// and is both returned and kept as `last_error`.
    pub fn finish_loading(
        &mut self,
        result: anyhow::Result<HistoryResponse>,
    ) -> Result<(), TelemetryError> {
        if self.state != PlaybackState::Loading {
            return Err(TelemetryError::FetchNotAllowed(self.state));
        }

        let record = result
            .map_err(|e| TelemetryError::HistoryUnavailable {
                vehicle: self.vehicle,
                reason: format!("{e:#}"),
            })
            .and_then(|response| HistoricalRecord::from_response(self.vehicle, response));

        match record {
            Ok(record) => {
                self.install(record);
                Ok(())
            }
            Err(e) => {
                warn!(vehicle = %self.vehicle, "History load failed: {e}");
                self.state = PlaybackState::Idle;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Load a record directly, skipping the fetch. Allowed from `Idle` or `Loading`.
    pub fn load_record(&mut self, record: HistoricalRecord) -> Result<(), TelemetryError> {
        match self.state {
            PlaybackState::Idle | PlaybackState::Loading => {
                self.install(record);
                Ok(())
            }
            other => Err(TelemetryError::FetchNotAllowed(other)),
        }
    }

    fn install(&mut self, record: HistoricalRecord) {
        info!(
            vehicle = %self.vehicle,
            duration = ?record.duration(),
            synthetic = record.is_synthetic(),
            "History loaded"
        );
        self.clock = VirtualClock::new(record.duration(), self.clock.speed());
        self.record = Some(record);
        self.state = PlaybackState::Ready;
        self.last_error = None;
    }

    /// Start or resume. From `Ended`, rewinds to 0 first.
    pub fn play(&mut self) -> PlaybackState {
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused => {}
            PlaybackState::Ended => {
                self.clock.seek(Duration::ZERO);
            }
            _ => return self.state,
        }
        self.clock.play();
        self.state = if self.clock.is_playing() {
            PlaybackState::Playing
        } else {
            // Zero-length record
            PlaybackState::Ended
        };
        self.state
    }

    /// Hold at the current offset
    pub fn pause(&mut self) -> PlaybackState {
        if self.state == PlaybackState::Playing {
            self.clock.pause();
            self.state = PlaybackState::Paused;
        }
        self.state
    }

    /// Play when paused, pause when playing
    pub fn toggle(&mut self) -> PlaybackState {
        if self.state == PlaybackState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) -> PlaybackState {
        if self.state.is_loaded() {
            self.clock.pause();
            self.clock.seek(Duration::ZERO);
            self.state = PlaybackState::Ready;
        }
        self.state
    }

    /// Jump to `target`, clamped to the record. Playing state is kept, except
    /// that landing on the end while playing ends playback.
    pub fn seek(&mut self, target: Duration) -> PlaybackState {
        if self.state.is_loaded() {
            self.clock.seek(target);
            self.after_seek();
        }
        self.state
    }

    /// Jump to a position in seconds, as produced by a slider
    pub fn seek_secs(&mut self, secs: f64) -> PlaybackState {
        if self.state.is_loaded() {
            self.clock.seek_secs(secs);
            self.after_seek();
        }
        self.state
    }

    fn after_seek(&mut self) {
        if self.clock.is_at_end() {
            if self.state == PlaybackState::Playing {
                self.clock.pause();
                self.state = PlaybackState::Ended;
            }
        } else if self.state == PlaybackState::Ended {
            self.state = PlaybackState::Paused;
        }
    }

    /// Set the speed multiplier for subsequent advances. Returns the clamped value.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.clock.set_speed(speed)
    }

    /// Move the clock by `elapsed` real time. Only effective while playing.
    pub fn advance(&mut self, elapsed: Duration) -> PlaybackState {
        if self.state == PlaybackState::Playing && self.clock.advance(elapsed) {
            debug!(vehicle = %self.vehicle, "Playback reached end of record");
            self.state = PlaybackState::Ended;
        }
        self.state
    }

    /// Window of `channel` ending at the current offset
    pub fn view(&self, channel: &str, window: Duration) -> Result<CurrentView, TelemetryError> {
        let Some(record) = &self.record else {
            return Ok(CurrentView::NotReady);
        };

        if !self.expected_channels.iter().any(|c| c == channel) {
            return Err(TelemetryError::UnknownChannel(channel.to_string()));
        }
        match record.channel(channel) {
            Some(ch) => {
                let (from, to) = trailing_window(self.clock.offset(), window);
                Ok(CurrentView::Ready(ch.view(from, to)))
            }
            None => Ok(CurrentView::Ready(Vec::new())),
        }
    }

    /// Configured channel names, in configuration order. Record channels
    /// outside the configuration are not exposed.
    pub fn channel_names(&self) -> Vec<String> {
        self.expected_channels.clone()
    }

    /// Wall-clock time at the current offset
    pub fn wall_clock(&self) -> Option<DateTime<Utc>> {
        self.record
            .as_ref()
            .and_then(|r| r.absolute_time(self.clock.offset()))
    }
}
