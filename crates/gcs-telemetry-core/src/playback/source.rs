//! History sources
//!
//! The pull endpoint that delivers historical records is an external
//! collaborator. [`load_history`] drives one fetch against a shared engine
//! without holding the engine lock across the await, so the user can switch
//! vehicle or mode while the fetch is in flight. A completion that arrives
//! after such a switch is discarded.

use std::future::Future;

use tokio::sync::Mutex;
use tracing::debug;

use super::HistoryResponse;
use crate::engine::{FetchOutcome, TelemetryEngine};
use crate::error::TelemetryError;
use crate::vehicle::VehicleId;

/// Anything that can fetch the full history of a vehicle
pub trait HistorySource {
    /// Fetch the complete buffered history of `vehicle`
    fn fetch_history(
        &self,
        vehicle: VehicleId,
    ) -> impl Future<Output = anyhow::Result<HistoryResponse>> + Send;
}

/// Run one history fetch for the engine's current playback activation
pub async fn load_history<S: HistorySource>(
    engine: &Mutex<TelemetryEngine>,
    source: &S,
) -> Result<FetchOutcome, TelemetryError> {
    let ticket = engine.lock().await.begin_history_fetch()?;
    debug!(vehicle = %ticket.vehicle(), activation = %ticket.activation(), "History fetch started");

    let result = source.fetch_history(ticket.vehicle()).await;

    engine.lock().await.complete_history_fetch(ticket, result)
}
