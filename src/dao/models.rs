use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::state::match_state::MatchState;

/// Identifier of the single match record held by the record store.
pub const RECORD_ID: u64 = 1;

/// Persisted envelope around the [`MatchState`].
///
/// `last_updated` is the only version token: two records with the same stamp
/// are considered identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Server-assigned identifier.
    #[serde(default = "default_record_id")]
    pub id: u64,
    /// Scoreboard document.
    #[serde(flatten)]
    pub state: MatchState,
    /// RFC 3339 timestamp of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl SyncRecord {
    /// Wrap a document without a version stamp.
    pub fn new(state: MatchState) -> Self {
        Self {
            id: RECORD_ID,
            state,
            last_updated: None,
        }
    }

    /// Stamp the record with the current wall-clock time.
    pub fn stamped(mut self) -> Self {
        self.last_updated = Some(now_rfc3339());
        self
    }

    /// Version token of the record.
    pub fn version(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }
}

fn default_record_id() -> u64 {
    RECORD_ID
}

/// Current UTC time formatted as RFC 3339.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
