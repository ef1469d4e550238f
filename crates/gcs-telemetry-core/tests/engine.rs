use anyhow::anyhow;
use gcs_telemetry_core::config::MIN_RETENTION;
use gcs_telemetry_core::demo::DemoHistory;
use gcs_telemetry_core::engine::{CurrentView, EngineMode, FetchOutcome, TelemetryEngine};
use gcs_telemetry_core::error::TelemetryError;
use gcs_telemetry_core::live::{IgnoreReason, IngestOutcome};
use gcs_telemetry_core::playback::{load_history, HistoryResponse, HistorySource, PlaybackState};
use gcs_telemetry_core::vehicle::{StatesResponse, TelemetryPush, VehicleId, VehicleState};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn roll_state(roll: f64) -> VehicleState {
    let mut state = VehicleState::default();
    state.attitude.roll_deg = Some(roll);
    state
}

fn playback_engine() -> TelemetryEngine {
    let mut engine = TelemetryEngine::default();
    engine.select_mode(EngineMode::Playback);
    let ticket = engine.begin_history_fetch().unwrap();
    let history = DemoHistory::default().generate(ticket.vehicle());
    engine.complete_history_fetch(ticket, Ok(history)).unwrap();
    engine
}

/// History source that blocks until released
struct GatedSource {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl HistorySource for GatedSource {
    async fn fetch_history(&self, vehicle: VehicleId) -> anyhow::Result<HistoryResponse> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(DemoHistory::default().generate(vehicle))
    }
}

struct FailingSource;

impl HistorySource for FailingSource {
    async fn fetch_history(&self, vehicle: VehicleId) -> anyhow::Result<HistoryResponse> {
        Err(anyhow!("connection refused while fetching {vehicle}"))
    }
}

struct DemoSource;

impl HistorySource for DemoSource {
    async fn fetch_history(&self, vehicle: VehicleId) -> anyhow::Result<HistoryResponse> {
        Ok(DemoHistory::default().generate(vehicle))
    }
}

#[test]
fn test_live_update_then_view() {
    init_tracing();
    let mut engine = TelemetryEngine::default();
    for (i, roll) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        let outcome = engine.on_state_update(
            VehicleId::Uav1,
            &roll_state(roll),
            Duration::from_millis(40 * i as u64),
        );
        assert!(outcome.is_applied());
    }

    let view = engine.current_view("attitude", Duration::from_secs(60)).unwrap();
    let rolls: Vec<_> = view.samples().iter().filter_map(|s| s.get("roll")).collect();
    assert_eq!(rolls, vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_live_view_window_ends_at_newest_sample() {
    let mut engine = TelemetryEngine::default();
    for s in 0..=100 {
        engine.on_state_update(VehicleId::Uav1, &roll_state(s as f64), Duration::from_secs(s));
    }

    let view = engine.current_view("attitude", Duration::from_secs(10)).unwrap();
    assert_eq!(view.samples().len(), 11);
    assert_eq!(view.samples()[0].timestamp(), Duration::from_secs(90));
}

#[test]
fn test_out_of_order_update_is_reported() {
    let mut engine = TelemetryEngine::default();
    engine.on_state_update(VehicleId::Uav1, &roll_state(1.0), Duration::from_secs(5));
    let outcome = engine.on_state_update(VehicleId::Uav1, &roll_state(2.0), Duration::from_secs(4));

    match outcome {
        IngestOutcome::Applied { appended, rejected } => {
            assert_eq!(appended, 0);
            assert!(rejected
                .iter()
                .all(|e| matches!(e, TelemetryError::OutOfOrderSample { .. })));
        }
        other => panic!("Expected applied outcome, got {other:?}"),
    }
    assert_eq!(engine.status().rejected_samples, 4);

    let view = engine.current_view("attitude", Duration::from_secs(60)).unwrap();
    assert_eq!(view.samples().len(), 1);
}

#[test]
fn test_push_for_other_vehicle_is_ignored() {
    let mut engine = TelemetryEngine::default();
    let push: TelemetryPush = serde_json::from_str(
        r#"{"vehicleId": "UGV1", "state": {"attitude": {"rollDeg": 4.0}}}"#,
    )
    .unwrap();

    assert_eq!(
        engine.on_push(&push, Duration::from_secs(1)),
        IngestOutcome::Ignored(IgnoreReason::OtherVehicle {
            expected: VehicleId::Uav1,
            actual: VehicleId::Ugv1,
        })
    );
    assert_eq!(
        engine.current_view("attitude", Duration::from_secs(60)),
        Ok(CurrentView::Ready(vec![]))
    );
}

#[test]
fn test_states_snapshot_picks_selected_vehicle() {
    let mut engine = TelemetryEngine::default();
    engine.select_vehicle(VehicleId::Ugv1);

    let snapshot: StatesResponse = serde_json::from_str(
        r#"{
            "success": true,
            "data": {
                "UAV1": {"attitude": {"rollDeg": 10.0}, "position": {"altitude": 42.0}},
                "UGV1": {"attitude": {"rollDeg": -2.5}, "motion": {"groundSpeed": 1.2}}
            },
            "timestamp": 1700000000.0
        }"#,
    )
    .unwrap();

    assert!(engine.on_states_snapshot(&snapshot, Duration::from_secs(1)).is_applied());

    let attitude = engine.current_view("attitude", Duration::from_secs(5)).unwrap();
    assert_eq!(attitude.samples()[0].get("roll"), Some(-2.5));
    let motion = engine.current_view("motion", Duration::from_secs(5)).unwrap();
    assert_eq!(motion.samples()[0].get("groundSpeed"), Some(1.2));
    // Ground vehicles report no altitude; the channel reads 0
    let altitude = engine.current_view("altitude", Duration::from_secs(5)).unwrap();
    assert_eq!(altitude.samples()[0].get("altitude"), Some(0.0));
}

#[test]
fn test_query_surface_matches_across_modes() {
    for vehicle in VehicleId::ALL {
        let mut live = TelemetryEngine::default();
        live.select_vehicle(vehicle);
        live.on_state_update(vehicle, &roll_state(1.0), Duration::from_secs(1));

        let mut playback = TelemetryEngine::default();
        playback.select_vehicle(vehicle);
        playback.select_mode(EngineMode::Playback);
        let ticket = playback.begin_history_fetch().unwrap();
        playback
            .complete_history_fetch(ticket, Ok(DemoHistory::default().generate(vehicle)))
            .unwrap();

        assert_eq!(live.channel_names(), playback.channel_names());
        for name in live.channel_names() {
            let live_view = live.current_view(&name, Duration::from_secs(10)).unwrap();
            let playback_view = playback.current_view(&name, Duration::from_secs(10)).unwrap();
            assert!(live_view.is_ready() && playback_view.is_ready(), "{vehicle} {name}");
        }
        assert!(live.current_view("lidar", Duration::from_secs(10)).is_err());
        assert!(playback.current_view("lidar", Duration::from_secs(10)).is_err());
    }
}

#[test]
fn test_ugv_altitude_reads_zero_in_both_modes() {
    let mut live = TelemetryEngine::default();
    live.select_vehicle(VehicleId::Ugv1);
    live.on_state_update(VehicleId::Ugv1, &roll_state(0.0), Duration::from_secs(1));
    let live_view = live.current_view("altitude", Duration::from_secs(10)).unwrap();
    assert_eq!(live_view.samples().len(), 1);
    assert_eq!(live_view.samples()[0].get("altitude"), Some(0.0));

    let mut playback = TelemetryEngine::default();
    playback.select_vehicle(VehicleId::Ugv1);
    playback.select_mode(EngineMode::Playback);
    let ticket = playback.begin_history_fetch().unwrap();
    playback
        .complete_history_fetch(ticket, Ok(DemoHistory::default().generate(VehicleId::Ugv1)))
        .unwrap();
    playback.seek(Duration::from_secs(30)).unwrap();
    let playback_view = playback.current_view("altitude", Duration::from_secs(10)).unwrap();
    assert_eq!(playback_view.samples().len(), 101);
    assert!(playback_view.samples().iter().all(|s| s.get("altitude") == Some(0.0)));
}

#[test]
fn test_unsuccessful_snapshot_is_ignored() {
    let mut engine = TelemetryEngine::default();
    let snapshot = StatesResponse::default();
    assert_eq!(
        engine.on_states_snapshot(&snapshot, Duration::from_secs(1)),
        IngestOutcome::Ignored(IgnoreReason::Unsuccessful)
    );
}

#[test]
fn test_staleness() {
    let mut engine = TelemetryEngine::default();
    assert!(engine.is_stale(Duration::ZERO));

    engine.on_state_update(VehicleId::Uav1, &roll_state(0.0), Duration::from_secs(1));
    assert!(!engine.is_stale(Duration::from_secs(2)));
    assert!(engine.is_stale(Duration::from_millis(3500)));

    let mut stale = roll_state(0.0);
    stale.data_stale = true;
    engine.on_state_update(VehicleId::Uav1, &stale, Duration::from_secs(4));
    assert!(engine.is_stale(Duration::from_secs(4)));
}

#[test]
fn test_retention_evicts_old_samples() {
    let mut engine = TelemetryEngine::default();
    assert_eq!(engine.set_retention(Duration::from_secs(60)), MIN_RETENTION);

    for s in 0..=120 {
        engine.on_state_update(VehicleId::Uav1, &roll_state(s as f64), Duration::from_secs(s));
    }

    let view = engine.current_view("attitude", Duration::from_secs(3600)).unwrap();
    assert_eq!(view.samples().first().unwrap().timestamp(), Duration::from_secs(60));
    assert_eq!(view.samples().len(), 61);
}

#[test]
fn test_settings_survive_activation() {
    let mut engine = TelemetryEngine::default();
    engine.set_update_rate(10.0);
    engine.set_retention(Duration::from_secs(120));
    engine.select_vehicle(VehicleId::Ugv1);

    assert_eq!(engine.poll_interval(), Duration::from_millis(100));
    assert_eq!(engine.config().retention_ms, 120_000);

    engine.set_update_rate(1000.0);
    assert_eq!(engine.config().rates.chart_hz, 200.0);
}

#[test]
fn test_mode_switch_clears_live_data() {
    let mut engine = TelemetryEngine::default();
    engine.on_state_update(VehicleId::Uav1, &roll_state(1.0), Duration::from_secs(1));

    engine.select_mode(EngineMode::Playback);
    assert_eq!(
        engine.on_state_update(VehicleId::Uav1, &roll_state(2.0), Duration::from_secs(2)),
        IngestOutcome::Ignored(IgnoreReason::NotLive)
    );

    engine.select_mode(EngineMode::Live);
    assert_eq!(
        engine.current_view("attitude", Duration::from_secs(60)),
        Ok(CurrentView::Ready(vec![]))
    );
}

#[test]
fn test_vehicle_switch_clears_record() {
    let mut engine = playback_engine();
    engine.select_vehicle(VehicleId::Ugv1);

    let status = engine.status();
    assert_eq!(status.mode, EngineMode::Playback);
    assert_eq!(status.playback_state, Some(PlaybackState::Idle));
    assert_eq!(status.duration, Duration::ZERO);
    assert_eq!(engine.current_view("attitude", Duration::from_secs(10)), Ok(CurrentView::NotReady));
}

#[test]
fn test_second_fetch_is_rejected() {
    let mut engine = TelemetryEngine::default();
    engine.select_mode(EngineMode::Playback);
    engine.begin_history_fetch().unwrap();

    assert_eq!(engine.begin_history_fetch(), Err(TelemetryError::FetchInProgress));
    assert!(engine.status().loading);
}

#[test]
fn test_refetch_after_load_is_not_allowed() {
    let mut engine = playback_engine();
    assert_eq!(
        engine.begin_history_fetch(),
        Err(TelemetryError::FetchNotAllowed(PlaybackState::Ready))
    );
}

#[test]
fn test_stale_fetch_completion_is_discarded() {
    let mut engine = TelemetryEngine::default();
    engine.select_mode(EngineMode::Playback);
    let ticket = engine.begin_history_fetch().unwrap();

    engine.select_vehicle(VehicleId::Ugv1);
    let outcome = engine
        .complete_history_fetch(ticket, Ok(DemoHistory::default().generate(VehicleId::Uav1)))
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Stale);
    assert_eq!(engine.status().playback_state, Some(PlaybackState::Idle));
    assert_eq!(engine.current_view("attitude", Duration::from_secs(10)), Ok(CurrentView::NotReady));
}

#[test]
fn test_failed_fetch_returns_to_idle() {
    let mut engine = TelemetryEngine::default();
    engine.select_mode(EngineMode::Playback);
    let ticket = engine.begin_history_fetch().unwrap();

    let result = engine.complete_history_fetch(ticket, Err(anyhow!("HTTP 503")));
    assert!(matches!(
        result,
        Err(TelemetryError::HistoryUnavailable { vehicle: VehicleId::Uav1, .. })
    ));

    let status = engine.status();
    assert_eq!(status.playback_state, Some(PlaybackState::Idle));
    assert!(status.history_error.unwrap().contains("HTTP 503"));
    assert!(!status.synthetic_history);

    // A retry is allowed
    assert!(engine.begin_history_fetch().is_ok());
}

#[test]
fn test_backend_failure_payload_is_surfaced() {
    let mut engine = TelemetryEngine::default();
    engine.select_mode(EngineMode::Playback);
    let ticket = engine.begin_history_fetch().unwrap();

    let response =
        HistoryResponse::from_json(r#"{"success": false, "error": "No history for vehicle"}"#)
            .unwrap();
    assert!(engine.complete_history_fetch(ticket, Ok(response)).is_err());
    assert_eq!(
        engine.status().history_error.as_deref(),
        Some("History unavailable for UAV1: No history for vehicle")
    );
}

#[test]
fn test_late_tick_after_vehicle_switch_has_no_effect() {
    let mut engine = playback_engine();
    let scheduler = engine.activation();
    engine.play().unwrap();
    assert!(engine.advance_for(scheduler, Duration::from_secs(1)));
    assert_eq!(engine.status().offset, Duration::from_secs(2));

    engine.select_vehicle(VehicleId::Ugv1);
    let ticket = engine.begin_history_fetch().unwrap();
    engine
        .complete_history_fetch(ticket, Ok(DemoHistory::default().generate(VehicleId::Ugv1)))
        .unwrap();
    engine.play().unwrap();

    assert!(!engine.advance_for(scheduler, Duration::from_secs(5)));
    assert_eq!(engine.status().offset, Duration::ZERO);
    assert_eq!(engine.status().vehicle, VehicleId::Ugv1);
}

#[test]
fn test_tick_in_live_mode_is_ignored() {
    let mut engine = TelemetryEngine::default();
    let activation = engine.activation();
    assert!(!engine.advance_for(activation, Duration::from_secs(1)));
}

#[test]
fn test_transport_controls() {
    let mut engine = playback_engine();

    assert_eq!(engine.set_speed(4.0), Ok(4.0));
    assert_eq!(engine.toggle_play(), Ok(PlaybackState::Playing));
    engine.advance(Duration::from_secs(5)).unwrap();
    assert_eq!(engine.status().offset, Duration::from_secs(20));

    assert_eq!(engine.toggle_play(), Ok(PlaybackState::Paused));
    assert_eq!(engine.seek_secs(45.0), Ok(PlaybackState::Paused));
    assert_eq!(engine.status().offset, Duration::from_secs(45));

    assert_eq!(engine.play(), Ok(PlaybackState::Playing));
    assert_eq!(engine.advance(Duration::from_secs(10)), Ok(PlaybackState::Ended));
    assert_eq!(engine.status().offset, Duration::from_secs(60));

    assert_eq!(engine.stop(), Ok(PlaybackState::Ready));
    assert_eq!(engine.status().offset, Duration::ZERO);
    assert!(!engine.status().playing);
}

#[test]
fn test_status_serializes() {
    let engine = playback_engine();
    let json = serde_json::to_value(engine.status()).unwrap();
    assert_eq!(json["vehicle"], "UAV1");
    assert_eq!(json["mode"], "Playback");
    assert_eq!(json["playback_state"], "Ready");
    assert_eq!(json["synthetic_history"], true);
}

#[tokio::test]
async fn test_load_history_installs_record() {
    init_tracing();
    let engine = Mutex::new(TelemetryEngine::default());
    engine.lock().await.select_mode(EngineMode::Playback);

    let outcome = load_history(&engine, &DemoSource).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Loaded);

    let engine = engine.lock().await;
    assert_eq!(engine.status().playback_state, Some(PlaybackState::Ready));
    assert_eq!(engine.status().duration, Duration::from_secs(60));
}

#[tokio::test]
async fn test_load_history_failure_is_reported() {
    let engine = Mutex::new(TelemetryEngine::default());
    engine.lock().await.select_mode(EngineMode::Playback);

    let result = load_history(&engine, &FailingSource).await;
    assert!(matches!(result, Err(TelemetryError::HistoryUnavailable { .. })));

    let status = engine.lock().await.status();
    assert_eq!(status.playback_state, Some(PlaybackState::Idle));
    assert!(status.history_error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_load_history_in_live_mode() {
    let engine = Mutex::new(TelemetryEngine::default());
    let result = load_history(&engine, &DemoSource).await;
    assert!(matches!(result, Err(TelemetryError::WrongMode { .. })));
}

#[tokio::test]
async fn test_vehicle_switch_during_fetch_discards_result() {
    init_tracing();
    let engine = Arc::new(Mutex::new(TelemetryEngine::default()));
    engine.lock().await.select_mode(EngineMode::Playback);

    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = GatedSource {
        started: started.clone(),
        release: release.clone(),
    };

    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { load_history(&engine, &source).await }
    });

    started.notified().await;
    {
        let mut engine = engine.lock().await;
        assert!(engine.status().loading);
        engine.select_vehicle(VehicleId::Ugv1);
    }
    release.notify_one();

    let outcome = fetch.await.unwrap().unwrap();
    assert_eq!(outcome, FetchOutcome::Stale);

    let engine = engine.lock().await;
    assert_eq!(engine.vehicle(), VehicleId::Ugv1);
    assert_eq!(engine.status().playback_state, Some(PlaybackState::Idle));
    assert_eq!(engine.current_view("attitude", Duration::from_secs(10)), Ok(CurrentView::NotReady));
}
