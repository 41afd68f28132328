//! Persistence backends for the match record.
//!
//! The sync engine only talks to [`MatchStore`] trait objects so it never cares
//! whether the record lives behind HTTP, in a file, or in memory.

pub mod file;
#[cfg(feature = "http-store")]
pub mod http;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::SyncRecord, storage::StorageResult};
use crate::state::match_state::MatchState;

/// Capability set shared by the remote authority and the local fallback.
pub trait MatchStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Read the current record.
    fn fetch(&self) -> BoxFuture<'static, StorageResult<SyncRecord>>;

    /// Replace the whole record, returning the canonical persisted copy.
    fn replace(&self, state: MatchState) -> BoxFuture<'static, StorageResult<SyncRecord>>;

    /// Lightweight reachability check.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Persist the fixed default document and return it.
    fn reset_to_default(&self) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        self.replace(MatchState::default())
    }
}
