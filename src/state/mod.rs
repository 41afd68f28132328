pub mod intents;
pub mod match_state;
mod sse;
pub mod store;
pub mod sync_mode;

use std::sync::Arc;

use tokio::sync::watch;

use crate::services::{
    dispatcher::IntentDispatcher,
    sse_service,
    sync_engine::SyncHandle,
};

pub use self::sse::SseHub;
use self::store::MatchStateStore;

pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 32;

/// State shared by the HTTP handlers.
pub struct AppState {
    store: Arc<MatchStateStore>,
    dispatcher: IntentDispatcher,
    sync: SyncHandle,
    sse: SseHub,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Every commit on `store` is forwarded to the SSE hub from here on.
    pub fn new(
        store: Arc<MatchStateStore>,
        sync: SyncHandle,
        shutdown: watch::Receiver<bool>,
    ) -> SharedState {
        let sse = SseHub::new(SSE_CAPACITY);
        let hub = sse.clone();
        store.subscribe(move |commit| sse_service::broadcast_state(&hub, &commit.state));

        Arc::new(Self {
            dispatcher: IntentDispatcher::new(store.clone(), sync.clone()),
            store,
            sync,
            sse,
            shutdown,
        })
    }

    /// The local match store.
    pub fn store(&self) -> &Arc<MatchStateStore> {
        &self.store
    }

    /// Dispatcher used to apply operator gestures.
    pub fn dispatcher(&self) -> &IntentDispatcher {
        &self.dispatcher
    }

    /// Handle on the synchronization engine.
    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    /// Broadcast hub used for the state SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Receiver flipped to `true` when the process shuts down.
    pub fn shutdown_watcher(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}
