//! Engine errors
//!
//! No variant here is fatal: every error leaves the engine in a well-defined,
//! queryable state.

use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineMode;
use crate::playback::PlaybackState;
use crate::vehicle::VehicleId;

/// Errors surfaced by buffers, the ingestor, the playback controller and the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// A sample older than the newest one in its channel was dropped
    #[error("Out-of-order sample on channel '{channel}': {timestamp:?} is before last {last:?}")]
    OutOfOrderSample {
        /// Channel the sample was meant for
        channel: String,
        /// Timestamp of the rejected sample
        timestamp: Duration,
        /// Newest timestamp already in the channel
        last: Duration,
    },

    /// The history fetch failed or returned no usable record
    #[error("History unavailable for {vehicle}: {reason}")]
    HistoryUnavailable {
        /// Vehicle whose history was requested
        vehicle: VehicleId,
        /// Display chain of the underlying failure
        reason: String,
    },

    /// The channel is not configured for the selected vehicle
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A second fetch was started while one is outstanding
    #[error("A history fetch is already in progress")]
    FetchInProgress,

    /// A fetch was started outside `Idle`
    #[error("Cannot fetch history while playback is {0:?}")]
    FetchNotAllowed(PlaybackState),

    /// A playback call was made in live mode
    #[error("Operation requires {expected:?} mode, engine is in {actual:?} mode")]
    WrongMode {
        /// Mode the call needs
        expected: EngineMode,
        /// Mode the engine is in
        actual: EngineMode,
    },
}

/// Errors that can occur while loading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid config JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
