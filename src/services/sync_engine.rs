//! Synchronization engine keeping the local match document converged with the
//! remote record store, falling back to the on-device copy when the remote is
//! unreachable.
//!
//! The engine is a single actor task. Backend calls are awaited inside the
//! actor, so pushes never overlap each other and polls never overlap each
//! other, while operators keep applying intents to the [`MatchStateStore`]
//! without waiting on the network.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        broadcast::{self, error::RecvError, error::TryRecvError},
        mpsc, oneshot, watch,
    },
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep_until},
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    dao::{
        match_store::MatchStore,
        models::SyncRecord,
        storage::StorageError,
    },
    error::ServiceError,
    state::{
        intents::{Intent, IntentOrigin},
        match_state::MatchState,
        store::{Commit, MatchStateStore},
        sync_mode::{SyncEvent, SyncMode, SyncStateMachine},
    },
};

const COMMAND_CHANNEL_CAPACITY: usize = 8;

/// Timing knobs of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period after the last local edit before it is pushed.
    pub debounce: Duration,
    /// Cadence of remote polls while synced.
    pub poll_interval: Duration,
    /// How long polls ignore remote version changes after a local write.
    pub suppression_window: Duration,
    /// Cadence of reachability probes while degraded.
    pub probe_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_secs(2),
            suppression_window: Duration::from_secs(3),
            probe_interval: Duration::from_secs(2),
        }
    }
}

/// What the control surface is allowed to know about synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Current connectivity mode.
    pub mode: SyncMode,
    /// Whether a backend call is in progress.
    pub is_loading: bool,
    /// Last remote version seen or written.
    pub last_version: Option<String>,
    /// Number of mode changes since startup.
    pub mode_changes: usize,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            mode: SyncMode::Initializing,
            is_loading: true,
            last_version: None,
            mode_changes: 0,
        }
    }
}

enum SyncCommand {
    Reset(oneshot::Sender<MatchState>),
    Refresh(oneshot::Sender<MatchState>),
}

/// Cloneable handle used to talk to a running [`SyncEngine`].
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Reset the match on the active backend and return the adopted document.
    pub async fn reset(&self) -> Result<MatchState, ServiceError> {
        self.request(SyncCommand::Reset).await
    }

    /// Reload the document from the active backend, whatever its version.
    pub async fn refresh(&self) -> Result<MatchState, ServiceError> {
        self.request(SyncCommand::Refresh).await
    }

    /// Latest published status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status updates.
    pub fn status_watcher(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    async fn request<F>(&self, command: F) -> Result<MatchState, ServiceError>
    where
        F: FnOnce(oneshot::Sender<MatchState>) -> SyncCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ServiceError::EngineStopped)?;
        rx.await.map_err(|_| ServiceError::EngineStopped)
    }
}

/// Guards polls against reading back our own writes.
///
/// Armed by every local edit and every successful remote push: the next poll is
/// skipped unconditionally and later polls are skipped until the window ends.
#[derive(Debug, Default)]
struct Suppression {
    skip_next: bool,
    until: Option<Instant>,
}

impl Suppression {
    fn arm(&mut self, now: Instant, window: Duration) {
        self.skip_next = true;
        self.until = Some(now + window);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the poll happening at `now` must be skipped.
    fn should_skip(&mut self, now: Instant) -> bool {
        if std::mem::take(&mut self.skip_next) {
            return true;
        }
        matches!(self.until, Some(until) if now < until)
    }
}

/// Actor owning the synchronization bookkeeping.
pub struct SyncEngine {
    store: Arc<MatchStateStore>,
    remote: Arc<dyn MatchStore>,
    local: Arc<dyn MatchStore>,
    settings: SyncSettings,
    machine: SyncStateMachine,
    last_version: Option<String>,
    suppression: Suppression,
    push_deadline: Option<Instant>,
    loading: bool,
    status: watch::Sender<SyncStatus>,
    commands: mpsc::Receiver<SyncCommand>,
    commits: broadcast::Receiver<Commit>,
}

impl SyncEngine {
    /// Build an engine over the given store and backends.
    ///
    /// The engine subscribes to commits right away so edits made before
    /// [`SyncEngine::run`] starts are not missed.
    pub fn new(
        store: Arc<MatchStateStore>,
        remote: Arc<dyn MatchStore>,
        local: Arc<dyn MatchStore>,
        settings: SyncSettings,
    ) -> (Self, SyncHandle) {
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let commits = store.commits();

        let engine = Self {
            store,
            remote,
            local,
            settings,
            machine: SyncStateMachine::new(),
            last_version: None,
            suppression: Suppression::default(),
            push_deadline: None,
            loading: true,
            status: status_tx,
            commands: commands_rx,
            commits,
        };
        let handle = SyncHandle {
            commands: commands_tx,
            status: status_rx,
        };

        (engine, handle)
    }

    /// Run the engine on its own task until `shutdown` flips to `true`.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Initialize from the backends, then process events until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.initialize().await;

        let start = Instant::now();
        let mut poll = interval_at(start + self.settings.poll_interval, self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut probe = interval_at(
            start + self.settings.probe_interval,
            self.settings.probe_interval,
        );
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let mode = self.machine.mode();
            let push_deadline = self.push_deadline;

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                commit = self.commits.recv() => self.on_commit(commit),
                Some(command) = self.commands.recv() => self.on_command(command).await,
                _ = sleep_until(push_deadline.unwrap_or_else(Instant::now)), if push_deadline.is_some() => {
                    self.flush().await;
                }
                _ = poll.tick(), if mode == SyncMode::SyncedRemote => self.poll_remote().await,
                _ = probe.tick(), if mode == SyncMode::DegradedLocal => self.probe_remote().await,
            }

            // Restart the cadence of whichever timer just became active so a
            // stale tick never fires right after a mode change.
            let next_mode = self.machine.mode();
            if next_mode != mode {
                match next_mode {
                    SyncMode::SyncedRemote => poll.reset(),
                    SyncMode::DegradedLocal => probe.reset(),
                    SyncMode::Initializing => {}
                }
            }
        }

        self.drain_commits();
        if self.push_deadline.is_some() {
            self.flush().await;
        }
        info!("sync engine stopped");
    }

    async fn initialize(&mut self) {
        self.set_loading(true);

        match self.remote.fetch().await {
            Ok(record) => {
                info!(
                    backend = self.remote.name(),
                    version = ?record.last_updated,
                    "loaded match record from remote"
                );
                self.adopt_remote(record);
                self.transition(SyncEvent::RemoteAdopted);
            }
            Err(StorageError::NotFound) => {
                info!(
                    backend = self.remote.name(),
                    "remote holds no match record yet; seeding it"
                );
                match self.remote.replace(self.store.snapshot()).await {
                    Ok(record) => {
                        self.last_version = record.last_updated;
                        self.transition(SyncEvent::RemoteAdopted);
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to seed remote record; using local fallback");
                        self.transition(SyncEvent::RemoteUnreachable);
                        self.load_local_fallback().await;
                    }
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    backend = self.remote.name(),
                    "remote record unavailable at startup; using local fallback"
                );
                self.transition(SyncEvent::RemoteUnreachable);
                self.load_local_fallback().await;
            }
        }

        self.set_loading(false);
    }

    async fn load_local_fallback(&mut self) {
        match self.local.fetch().await {
            Ok(record) => {
                info!(
                    backend = self.local.name(),
                    version = ?record.last_updated,
                    "loaded match record from local fallback"
                );
                self.adopt_local(record);
            }
            Err(StorageError::NotFound) => {
                info!("no local match record; keeping defaults");
            }
            Err(err) => {
                warn!(error = %err, "failed to read local fallback; keeping defaults");
            }
        }
    }

    fn on_commit(&mut self, commit: Result<Commit, RecvError>) {
        match commit {
            Ok(commit) if commit.is_local_edit() => self.note_local_edit(),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "commit stream lagged; scheduling a push");
                self.note_local_edit();
            }
            Err(RecvError::Closed) => {}
        }
    }

    /// Process commits already queued without waiting for new ones.
    fn drain_commits(&mut self) {
        loop {
            match self.commits.try_recv() {
                Ok(commit) => self.on_commit(Ok(commit)),
                Err(TryRecvError::Lagged(skipped)) => self.on_commit(Err(RecvError::Lagged(skipped))),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn note_local_edit(&mut self) {
        let now = Instant::now();
        self.push_deadline = Some(now + self.settings.debounce);
        self.suppression.arm(now, self.settings.suppression_window);
    }

    async fn on_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Reset(reply) => {
                let state = self.reset().await;
                let _ = reply.send(state);
            }
            SyncCommand::Refresh(reply) => {
                let state = self.refresh().await;
                let _ = reply.send(state);
            }
        }
    }

    /// Push the current snapshot to the active backend.
    async fn flush(&mut self) {
        self.push_deadline = None;
        let snapshot = self.store.snapshot();
        self.set_loading(true);

        if self.machine.mode() == SyncMode::SyncedRemote {
            match self.remote.replace(snapshot.clone()).await {
                Ok(record) => {
                    debug!(version = ?record.last_updated, "pushed match record to remote");
                    self.last_version = record.last_updated;
                    self.suppression
                        .arm(Instant::now(), self.settings.suppression_window);
                }
                Err(err) => {
                    warn!(error = %err, "remote push failed; switching to local fallback");
                    self.transition(SyncEvent::RemoteUnreachable);
                    self.write_local(snapshot).await;
                }
            }
        } else {
            self.write_local(snapshot).await;
        }

        self.set_loading(false);
    }

    async fn write_local(&mut self, state: MatchState) -> Option<SyncRecord> {
        match self.local.replace(state).await {
            Ok(record) => {
                debug!(version = ?record.last_updated, "saved match record to local fallback");
                Some(record)
            }
            Err(err @ StorageError::StorageFull { .. }) => {
                error!(error = %err, "local fallback is full; edit kept in memory only");
                None
            }
            Err(err) => {
                error!(error = %err, "local fallback write failed; edit kept in memory only");
                None
            }
        }
    }

    async fn poll_remote(&mut self) {
        if self.push_deadline.is_some() {
            trace!("local edit pending; skipping poll");
            return;
        }
        if self.suppression.should_skip(Instant::now()) {
            trace!("recent local write; skipping poll");
            return;
        }

        let record = match self.remote.fetch().await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "remote poll failed; switching to local fallback");
                self.transition(SyncEvent::RemoteUnreachable);
                return;
            }
        };

        if record.last_updated == self.last_version {
            return;
        }

        // An operator may have edited while the fetch was in flight.
        self.drain_commits();
        if self.push_deadline.is_some() {
            debug!("local edit arrived during poll; keeping it over the remote record");
            return;
        }

        info!(version = ?record.last_updated, "external change detected; adopting remote record");
        self.adopt_remote(record);
        self.transition(SyncEvent::RemoteAdopted);
    }

    async fn probe_remote(&mut self) {
        if let Err(err) = self.remote.health_check().await {
            debug!(error = %err, "remote still unreachable");
            return;
        }

        self.drain_commits();
        let snapshot = self.store.snapshot();
        self.set_loading(true);

        match self.remote.replace(snapshot).await {
            Ok(record) => {
                info!(
                    version = ?record.last_updated,
                    "remote reachable again; local snapshot pushed"
                );
                self.last_version = record.last_updated;
                self.push_deadline = None;
                self.suppression
                    .arm(Instant::now(), self.settings.suppression_window);
                self.transition(SyncEvent::RemoteRecovered);
            }
            Err(err) => {
                warn!(error = %err, "recovery push failed; staying on local fallback");
            }
        }

        self.set_loading(false);
    }

    async fn reset(&mut self) -> MatchState {
        self.push_deadline = None;
        self.suppression.clear();
        self.last_version = None;
        self.store
            .apply(Intent::Load(MatchState::default()), IntentOrigin::External);
        self.set_loading(true);

        if self.machine.mode() == SyncMode::SyncedRemote {
            match self.remote.reset_to_default().await {
                Ok(record) => {
                    info!(version = ?record.last_updated, "match reset on remote");
                    self.adopt_remote(record);
                }
                Err(err) => {
                    warn!(error = %err, "remote reset failed; switching to local fallback");
                    self.transition(SyncEvent::RemoteUnreachable);
                    self.reset_local().await;
                }
            }
        } else {
            self.reset_local().await;
        }

        self.set_loading(false);
        self.store.snapshot()
    }

    async fn reset_local(&mut self) {
        match self.local.reset_to_default().await {
            Ok(record) => {
                info!("match reset on local fallback");
                self.adopt_local(record);
            }
            Err(err) => error!(error = %err, "local fallback reset failed; reset kept in memory only"),
        }
    }

    async fn refresh(&mut self) -> MatchState {
        self.set_loading(true);

        if self.machine.mode() == SyncMode::SyncedRemote {
            match self.remote.fetch().await {
                Ok(record) => {
                    self.push_deadline = None;
                    self.adopt_remote(record);
                }
                Err(err) => {
                    warn!(error = %err, "remote refresh failed; switching to local fallback");
                    self.transition(SyncEvent::RemoteUnreachable);
                }
            }
        } else {
            match self.local.fetch().await {
                Ok(record) => {
                    self.push_deadline = None;
                    self.adopt_local(record);
                }
                Err(StorageError::NotFound) => debug!("no local match record to refresh from"),
                Err(err) => warn!(error = %err, "local refresh failed"),
            }
        }

        self.set_loading(false);
        self.store.snapshot()
    }

    fn adopt_remote(&mut self, record: SyncRecord) {
        self.last_version = record.last_updated;
        self.store.apply(Intent::Load(record.state), IntentOrigin::External);
        self.publish();
    }

    fn adopt_local(&mut self, record: SyncRecord) {
        self.store.apply(Intent::Load(record.state), IntentOrigin::External);
    }

    fn transition(&mut self, event: SyncEvent) {
        let before = self.machine.mode();
        match self.machine.apply(event) {
            Ok(after) if after != before => {
                info!(
                    from = before.label(),
                    to = after.label(),
                    version = self.machine.version(),
                    "sync mode changed"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "ignored sync mode event"),
        }
        self.publish();
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.publish();
    }

    fn publish(&self) {
        let next = SyncStatus {
            mode: self.machine.mode(),
            is_loading: self.loading,
            last_version: self.last_version.clone(),
            mode_changes: self.machine.version(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
