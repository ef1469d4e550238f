//! Telemetry Engine
//!
//! The single owner of telemetry state. Exactly one mode is active at a time:
//! live ingestion or playback of a historical record. Every vehicle or mode
//! selection starts a new activation with empty state, so data from one
//! vehicle or mode can never be shown under another.
//!
//! The engine schedules nothing itself. Callers drive it with discrete calls:
//! state updates in live mode, `advance` ticks in playback mode, and the
//! begin/complete pair around a history fetch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::channel::{ChannelLimits, Sample};
use crate::config::{EngineConfig, UpdateRates, MAX_RETENTION, MIN_RETENTION};
use crate::error::TelemetryError;
use crate::live::{IgnoreReason, IngestOutcome, LiveIngestor};
use crate::playback::{HistoryResponse, PlaybackController, PlaybackState};
use crate::vehicle::{StatesResponse, TelemetryPush, VehicleId, VehicleState};

/// Engine operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineMode {
    /// Buffers grow from pushed or polled vehicle state
    Live,
    /// Views are sliced from a historical record
    Playback,
}

/// Identifies one vehicle+mode activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActivationId(Uuid);

impl ActivationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Proof of an outstanding history fetch, bound to the activation that started it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    activation: ActivationId,
    vehicle: VehicleId,
}

impl FetchTicket {
    /// Activation the fetch belongs to
    pub fn activation(&self) -> ActivationId {
        self.activation
    }

    /// Vehicle whose history should be fetched
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }
}

/// Result of completing a history fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The record was installed
    Loaded,
    /// The activation changed while fetching; the result was discarded
    Stale,
}

/// What renderers get for a channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CurrentView {
    /// Ordered samples of the window (possibly empty)
    Ready(Vec<Sample>),
    /// Playback has no record yet
    NotReady,
}

impl CurrentView {
    /// Check whether the view carries data
    pub fn is_ready(&self) -> bool {
        matches!(self, CurrentView::Ready(_))
    }

    /// Samples of the window; empty when not ready
    pub fn samples(&self) -> &[Sample] {
        match self {
            CurrentView::Ready(samples) => samples,
            CurrentView::NotReady => &[],
        }
    }
}

/// Snapshot for transport controls and status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    /// Selected vehicle
    pub vehicle: VehicleId,
    /// Active mode
    pub mode: EngineMode,
    /// Current activation
    pub activation: ActivationId,
    /// `None` in live mode
    pub playback_state: Option<PlaybackState>,
    /// A history fetch is outstanding
    pub loading: bool,
    /// Playback clock is running
    pub playing: bool,
    /// Playback offset, zero in live mode
    pub offset: Duration,
    /// Record length, zero in live mode
    pub duration: Duration,
    /// Playback speed multiplier
    pub speed: f64,
    /// Last history failure of this activation
    pub history_error: Option<String>,
    /// The loaded record was generated, not recorded
    pub synthetic_history: bool,
    /// Live samples rejected, or record points dropped
    pub rejected_samples: u64,
    /// Wall-clock time at the playback offset
    pub wall_clock: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ActiveMode {
    Live(LiveIngestor),
    Playback(PlaybackController),
}

/// Façade over live ingestion and playback
#[derive(Debug)]
pub struct TelemetryEngine {
    config: EngineConfig,
    vehicle: VehicleId,
    activation: ActivationId,
    active: ActiveMode,
}

impl TelemetryEngine {
    /// Create an engine in live mode for the configured initial vehicle
    pub fn new(config: EngineConfig) -> Self {
        let vehicle = config.initial_vehicle;
        let active = ActiveMode::Live(LiveIngestor::new(vehicle, &config));
        let activation = ActivationId::new();
        info!(%vehicle, %activation, "Telemetry engine initialized");

        Self {
            config,
            vehicle,
            activation,
            active,
        }
    }

    /// Active configuration, including runtime rate and retention changes
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Selected vehicle
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Active mode
    pub fn mode(&self) -> EngineMode {
        match self.active {
            ActiveMode::Live(_) => EngineMode::Live,
            ActiveMode::Playback(_) => EngineMode::Playback,
        }
    }

    /// Current activation. Schedulers capture this when they start ticking.
    pub fn activation(&self) -> ActivationId {
        self.activation
    }

    /// Switch vehicle, discarding all state of the current activation
    pub fn select_vehicle(&mut self, vehicle: VehicleId) {
        self.activate(vehicle, self.mode());
    }

    /// Switch mode, discarding all state of the current activation
    pub fn select_mode(&mut self, mode: EngineMode) {
        self.activate(self.vehicle, mode);
    }

    fn activate(&mut self, vehicle: VehicleId, mode: EngineMode) {
        let previous = self.activation;
        self.vehicle = vehicle;
        self.activation = ActivationId::new();
        self.active = match mode {
            EngineMode::Live => ActiveMode::Live(LiveIngestor::new(vehicle, &self.config)),
            EngineMode::Playback => {
                ActiveMode::Playback(PlaybackController::new(vehicle, &self.config))
            }
        };
        info!(%vehicle, ?mode, %previous, activation = %self.activation, "Activation replaced");
    }

    /// Shut the engine down, dropping every buffer and record
    pub fn dispose(self) {
        info!(vehicle = %self.vehicle, activation = %self.activation, "Telemetry engine disposed");
    }

    // --- Views ---

    /// Window of `channel` ending at the newest live sample or the playback offset
    pub fn current_view(
        &self,
        channel: &str,
        window: Duration,
    ) -> Result<CurrentView, TelemetryError> {
        match &self.active {
            ActiveMode::Live(ingestor) => ingestor
                .buffer()
                .latest_window(channel, window)
                .map(CurrentView::Ready),
            ActiveMode::Playback(controller) => controller.view(channel, window),
        }
    }

    /// `current_view` with the configured default window
    pub fn current_view_default(&self, channel: &str) -> Result<CurrentView, TelemetryError> {
        self.current_view(channel, self.config.window())
    }

    /// Channels that can be viewed in the current activation, in configuration order.
    ///
    /// The same for live and playback on a given vehicle.
    pub fn channel_names(&self) -> Vec<String> {
        match &self.active {
            ActiveMode::Live(ingestor) => ingestor.channel_names().map(String::from).collect(),
            ActiveMode::Playback(controller) => controller.channel_names(),
        }
    }

    /// Status for transport controls
    pub fn status(&self) -> EngineStatus {
        match &self.active {
            ActiveMode::Live(ingestor) => EngineStatus {
                vehicle: self.vehicle,
                mode: EngineMode::Live,
                activation: self.activation,
                playback_state: None,
                loading: false,
                playing: false,
                offset: Duration::ZERO,
                duration: Duration::ZERO,
                speed: self.config.default_speed,
                history_error: None,
                synthetic_history: false,
                rejected_samples: ingestor.stats().rejected,
                wall_clock: None,
            },
            ActiveMode::Playback(controller) => {
                let clock = controller.clock();
                let record = controller.record();
                EngineStatus {
                    vehicle: self.vehicle,
                    mode: EngineMode::Playback,
                    activation: self.activation,
                    playback_state: Some(controller.state()),
                    loading: controller.state() == PlaybackState::Loading,
                    playing: clock.is_playing(),
                    offset: clock.offset(),
                    duration: clock.duration(),
                    speed: clock.speed(),
                    history_error: controller.last_error().map(ToString::to_string),
                    synthetic_history: record.is_some_and(|r| r.is_synthetic()),
                    rejected_samples: record.map_or(0, |r| r.dropped() as u64),
                    wall_clock: controller.wall_clock(),
                }
            }
        }
    }

    // --- Live ---

    /// Feed one state snapshot of `vehicle` taken at `now`
    pub fn on_state_update(
        &mut self,
        vehicle: VehicleId,
        state: &VehicleState,
        now: Duration,
    ) -> IngestOutcome {
        match &mut self.active {
            ActiveMode::Live(ingestor) => ingestor.on_state_update(vehicle, state, now),
            ActiveMode::Playback(_) => {
                trace!(%vehicle, "Ignoring live update in playback mode");
                IngestOutcome::Ignored(IgnoreReason::NotLive)
            }
        }
    }

    /// Feed a socket push message
    pub fn on_push(&mut self, push: &TelemetryPush, now: Duration) -> IngestOutcome {
        self.on_state_update(push.vehicle_id, &push.state, now)
    }

    /// Feed a poll response covering every vehicle
    pub fn on_states_snapshot(&mut self, snapshot: &StatesResponse, now: Duration) -> IngestOutcome {
        match &mut self.active {
            ActiveMode::Live(ingestor) => ingestor.on_states_snapshot(snapshot, now),
            ActiveMode::Playback(_) => IngestOutcome::Ignored(IgnoreReason::NotLive),
        }
    }

    /// Check whether live data is missing or too old. Always `false` in playback.
    pub fn is_stale(&self, now: Duration) -> bool {
        match &self.active {
            ActiveMode::Live(ingestor) => ingestor.is_stale(now),
            ActiveMode::Playback(_) => false,
        }
    }

    /// Set the chart polling rate. Kept across activations.
    pub fn set_update_rate(&mut self, hz: f64) {
        if let ActiveMode::Live(ingestor) = &mut self.active {
            ingestor.set_update_rate(hz);
        }
        self.config.rates.chart_hz = UpdateRates::clamp_rate(hz);
    }

    /// Interval at which the caller should poll chart data
    pub fn poll_interval(&self) -> Duration {
        self.config.rates.chart_interval()
    }

    /// Set how much live history is retained, clamped to 1 minute – 1 hour.
    ///
    /// Applies to the live buffers immediately and to later activations.
    pub fn set_retention(&mut self, span: Duration) -> Duration {
        let span = span.clamp(MIN_RETENTION, MAX_RETENTION);
        self.config.retention_ms = span.as_millis() as u64;
        if let ActiveMode::Live(ingestor) = &mut self.active {
            ingestor.set_limits(ChannelLimits::new(self.config.max_samples, span));
        }
        debug!(retention = ?span, "Retention updated");
        span
    }

    // --- Playback ---

    /// Start a history fetch for the current activation
    pub fn begin_history_fetch(&mut self) -> Result<FetchTicket, TelemetryError> {
        let controller = self.controller_mut()?;
        controller.begin_loading()?;
        Ok(FetchTicket {
            activation: self.activation,
            vehicle: self.vehicle,
        })
    }

    /// Resolve a fetch started by `begin_history_fetch`.
    ///
    /// Tickets from an earlier activation are discarded without touching the
    /// current state.
    pub fn complete_history_fetch(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<HistoryResponse>,
    ) -> Result<FetchOutcome, TelemetryError> {
        if ticket.activation != self.activation {
            debug!(
                stale = %ticket.activation,
                current = %self.activation,
                "Discarding history for a previous activation"
            );
            return Ok(FetchOutcome::Stale);
        }
        self.controller_mut()?.finish_loading(result)?;
        Ok(FetchOutcome::Loaded)
    }

    /// Start or resume playback
    pub fn play(&mut self) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.play())
    }

    /// Hold playback at the current offset
    pub fn pause(&mut self) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.pause())
    }

    /// Play when paused, pause when playing
    pub fn toggle_play(&mut self) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.toggle())
    }

    /// Pause and rewind to the start of the record
    pub fn stop(&mut self) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.stop())
    }

    /// Jump to an offset, clamped to the record. Landing on the end while playing ends playback
    pub fn seek(&mut self, target: Duration) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.seek(target))
    }

    /// Jump to a slider position in seconds
    pub fn seek_secs(&mut self, secs: f64) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.seek_secs(secs))
    }

    /// Returns the clamped speed actually applied
    pub fn set_speed(&mut self, speed: f64) -> Result<f64, TelemetryError> {
        Ok(self.controller_mut()?.set_speed(speed))
    }

    /// Move the playback clock by `elapsed` real time
    pub fn advance(&mut self, elapsed: Duration) -> Result<PlaybackState, TelemetryError> {
        Ok(self.controller_mut()?.advance(elapsed))
    }

    /// Tick on behalf of the scheduler that captured `activation`.
    ///
    /// Returns `false` without side effects when that activation is no longer
    /// current or the engine is not in playback.
    pub fn advance_for(&mut self, activation: ActivationId, elapsed: Duration) -> bool {
        if activation != self.activation {
            trace!(%activation, "Ignoring tick from a previous activation");
            return false;
        }
        match &mut self.active {
            ActiveMode::Playback(controller) => {
                controller.advance(elapsed);
                true
            }
            ActiveMode::Live(_) => false,
        }
    }

    fn controller_mut(&mut self) -> Result<&mut PlaybackController, TelemetryError> {
        match &mut self.active {
            ActiveMode::Playback(controller) => Ok(controller),
            ActiveMode::Live(_) => Err(TelemetryError::WrongMode {
                expected: EngineMode::Playback,
                actual: EngineMode::Live,
            }),
        }
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
