//! Playback
//!
//! Replays a pre-fetched historical record through a virtual clock. Views are
//! sliced from the record at the clock offset with the same windowing rule the
//! live buffers use.

mod clock;
mod controller;
mod record;
pub mod source;

pub use clock::{clamp_speed, VirtualClock, MAX_SPEED, MIN_SPEED};
pub use controller::PlaybackController;
pub use record::{HistoricalRecord, HistoryPoint, HistoryResponse};
pub use source::{load_history, HistorySource};

use serde::Serialize;

/// Playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// No record loaded
    Idle,
    /// A history fetch is outstanding
    Loading,
    /// Record loaded, not started (or rewound by stop)
    Ready,
    /// Clock running
    Playing,
    /// Clock held at a fixed offset
    Paused,
    /// Clock reached the end of the record
    Ended,
}

impl PlaybackState {
    /// Check whether a record is available
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ended
        )
    }
}
