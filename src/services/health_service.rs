use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState, state::sync_mode::SyncMode};

/// Report the sync mode, logging when the remote authority is unreachable.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let status = state.sync().status();
    if status.mode == SyncMode::DegradedLocal {
        warn!("remote authority unreachable (degraded mode)");
    }

    HealthResponse::from(&status)
}
