use serde::Serialize;

use crate::services::sync_engine::SyncStatus;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Sync mode (`synced`, `degraded` or `initializing`).
    pub status: String,
    /// Whether a backend call is in progress.
    pub loading: bool,
}

impl From<&SyncStatus> for HealthResponse {
    fn from(status: &SyncStatus) -> Self {
        Self {
            status: status.mode.label().to_string(),
            loading: status.is_loading,
        }
    }
}
