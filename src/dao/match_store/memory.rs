//! In-process match store, used when embedding the engine without a record
//! service and to simulate a flaky remote authority.

use std::{
    io,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use futures::future::BoxFuture;

use crate::dao::{
    match_store::MatchStore,
    models::{RECORD_ID, SyncRecord},
    storage::{StorageError, StorageResult},
};
use crate::state::match_state::MatchState;

#[derive(Default)]
struct MemoryInner {
    record: Mutex<Option<SyncRecord>>,
    offline: AtomicBool,
    revision: AtomicU64,
    fetches: AtomicU64,
    writes: AtomicU64,
}

/// Match store keeping the record in memory.
///
/// Version stamps are monotonically increasing revision tokens. The store can
/// be switched offline, in which case every call fails with
/// [`StorageError::Unreachable`].
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<MemoryInner>,
}

impl MemoryMatchStore {
    /// Empty store; `fetch` fails with [`StorageError::NotFound`] until written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding `state`.
    pub fn with_state(state: MatchState) -> Self {
        let store = Self::new();
        store.write(state);
        store
    }

    /// Simulate a connectivity loss or recovery.
    pub fn set_online(&self, online: bool) {
        self.inner.offline.store(!online, Ordering::SeqCst);
    }

    /// Write a record as another client would, bypassing the connectivity flag.
    pub fn write(&self, state: MatchState) -> SyncRecord {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let record = SyncRecord {
            id: RECORD_ID,
            state,
            last_updated: Some(format!("rev-{revision:08}")),
        };
        *self.lock() = Some(record.clone());
        record
    }

    /// Current record, bypassing the connectivity flag.
    pub fn peek(&self) -> Option<SyncRecord> {
        self.lock().clone()
    }

    /// Number of successful fetches served.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Number of successful writes through the [`MatchStore`] interface.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SyncRecord>> {
        self.inner
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(StorageError::unreachable(
                "memory store offline".into(),
                io::Error::from(io::ErrorKind::NotConnected),
            ))
        } else {
            Ok(())
        }
    }
}

impl MatchStore for MemoryMatchStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let record = store.peek().ok_or(StorageError::NotFound)?;
            store.inner.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(record)
        })
    }

    fn replace(&self, state: MatchState) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.inner.writes.fetch_add(1, Ordering::SeqCst);
            Ok(store.write(state))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }
}
