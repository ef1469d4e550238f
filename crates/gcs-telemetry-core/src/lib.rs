//! # GCS Telemetry Core Library
//!
//! Telemetry stream and playback engine for the ground control station.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Bounded, time-windowed sample channels per vehicle
//! - Live ingestion of pushed or polled vehicle state
//! - Playback of historical records on a virtual clock (speed, seek, pause)
//! - A single engine façade that switches cleanly between live and playback
//!
//! ## Supported Vehicles
//!
//! - UAV1 (aerial)
//! - UGV1 (ground)
//!
//! ## Example
//!
//! ```rust,ignore
//! use gcs_telemetry_core::prelude::*;
//! use std::time::Duration;
//!
//! let mut engine = TelemetryEngine::new(EngineConfig::default());
//!
//! // Live: feed a state snapshot at the caller's cadence
//! let state = VehicleState::from_json(r#"{"attitude": {"rollDeg": -2.3}}"#)?;
//! engine.on_state_update(VehicleId::Uav1, &state, Duration::from_millis(40));
//! let view = engine.current_view("attitude", Duration::from_secs(60))?;
//!
//! // Playback: fetch history, then drive the virtual clock
//! engine.select_mode(EngineMode::Playback);
//! let ticket = engine.begin_history_fetch()?;
//! engine.complete_history_fetch(ticket, fetch(ticket.vehicle()).await)?;
//! engine.play()?;
//! engine.advance(Duration::from_millis(16))?;
//! ```

pub mod channel;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod live;
pub mod playback;
pub mod vehicle;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::channel::{ChannelLimits, Sample, SampleChannel, WindowedBuffer};
    pub use crate::config::{ChannelSpec, EngineConfig, FieldMapping, UpdateRates};
    pub use crate::engine::{
        ActivationId, CurrentView, EngineMode, EngineStatus, FetchOutcome, FetchTicket,
        TelemetryEngine,
    };
    pub use crate::error::{ConfigError, TelemetryError};
    pub use crate::live::{IgnoreReason, IngestOutcome, LiveIngestor};
    pub use crate::playback::{
        load_history, HistoricalRecord, HistoryResponse, HistorySource, PlaybackController,
        PlaybackState, VirtualClock,
    };
    pub use crate::vehicle::{
        FieldSource, StatesResponse, TelemetryPush, VehicleId, VehicleState,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
