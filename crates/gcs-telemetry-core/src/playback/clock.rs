//! Virtual playback clock

use serde::Serialize;
use std::time::Duration;

/// Slowest accepted playback speed
pub const MIN_SPEED: f64 = 0.1;

/// Fastest accepted playback speed
pub const MAX_SPEED: f64 = 16.0;

/// Clamp a speed multiplier into `[MIN_SPEED, MAX_SPEED]`.
///
/// NaN, zero and negative values map to the minimum.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() || speed <= 0.0 {
        return MIN_SPEED;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

/// Playback position within a record, decoupled from wall-clock time.
///
/// `offset` always stays within `[0, duration]`, and reaching `duration`
/// stops the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualClock {
    offset: Duration,
    duration: Duration,
    speed: f64,
    playing: bool,
}

impl VirtualClock {
    /// Create a stopped clock at offset 0
    pub fn new(duration: Duration, speed: f64) -> Self {
        Self {
            offset: Duration::ZERO,
            duration,
            speed: clamp_speed(speed),
            playing: false,
        }
    }

    /// Position within the record
    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Record length
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Speed multiplier
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Check if the clock is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Check if the offset sits on the end of the record
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.duration
    }

    /// Start running. Has no effect at the end of the record.
    pub fn play(&mut self) {
        self.playing = !self.is_at_end();
    }

    /// Stop running, keeping the offset
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Move to `target`, clamped to `[0, duration]`. The playing flag is kept.
    pub fn seek(&mut self, target: Duration) -> Duration {
        self.offset = target.min(self.duration);
        self.offset
    }

    /// Move to a position given in seconds. Negative and NaN input seek to 0.
    pub fn seek_secs(&mut self, secs: f64) -> Duration {
        let target = if secs.is_nan() || secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        };
        self.seek(target)
    }

    /// Set the speed used by subsequent `advance` calls (clamped)
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.speed = clamp_speed(speed);
        self.speed
    }

    /// Move forward by `elapsed` real time scaled by the speed.
    ///
    /// Does nothing while paused. Returns `true` when this call reached the
    /// end of the record, which also stops the clock.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.playing {
            return false;
        }

        let scaled = Duration::try_from_secs_f64(elapsed.as_secs_f64() * self.speed)
            .unwrap_or(Duration::MAX);
        self.offset = self.offset.saturating_add(scaled).min(self.duration);

        if self.is_at_end() {
            self.playing = false;
            return true;
        }
        false
    }
}
