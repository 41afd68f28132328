use std::sync::{Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::state::{
    intents::{Intent, IntentOrigin, transition},
    match_state::MatchState,
};

const COMMIT_CHANNEL_CAPACITY: usize = 64;

/// Record published after every applied intent.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Who emitted the intent.
    pub origin: IntentOrigin,
    /// Name of the applied intent, see [`Intent::name`].
    pub intent: &'static str,
    /// Whether the intent is one the sync engine persists.
    pub needs_push: bool,
    /// Document after the transition.
    pub state: MatchState,
}

impl Commit {
    /// A locally emitted edit that must reach the active backend.
    pub fn is_local_edit(&self) -> bool {
        self.origin == IntentOrigin::Local && self.needs_push
    }
}

type Listener = Box<dyn Fn(&Commit) + Send + Sync>;

/// Exclusive in-memory owner of the [`MatchState`].
///
/// Every mutation goes through [`MatchStateStore::apply`]; readers only ever get
/// owned snapshots. Applies are serialized so listeners observe commits in order.
pub struct MatchStateStore {
    state: watch::Sender<MatchState>,
    commits: broadcast::Sender<Commit>,
    listeners: Mutex<Vec<Listener>>,
}

impl Default for MatchStateStore {
    fn default() -> Self {
        Self::new(MatchState::default())
    }
}

impl MatchStateStore {
    /// Build a store holding `initial`.
    pub fn new(initial: MatchState) -> Self {
        let (commits, _rx) = broadcast::channel(COMMIT_CHANNEL_CAPACITY);
        Self {
            state: watch::Sender::new(initial),
            commits,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Apply an intent, notify subscribers and return the new document.
    ///
    /// Listeners run synchronously on the calling thread and must not call back
    /// into the store.
    pub fn apply(&self, intent: Intent, origin: IntentOrigin) -> MatchState {
        self.update(|_| intent, origin)
    }

    /// Build an intent from the current document and apply it atomically.
    ///
    /// `resolve` runs while applies are serialized, so relative edits such as
    /// "+1 goal" never race each other.
    pub fn update<F>(&self, resolve: F, origin: IntentOrigin) -> MatchState
    where
        F: FnOnce(&MatchState) -> Intent,
    {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (intent, next) = {
            let current = self.state.borrow();
            let intent = resolve(&current);
            let next = transition(&current, &intent);
            (intent, next)
        };
        self.state.send_replace(next.clone());

        if origin != IntentOrigin::TimeDerived {
            debug!(intent = intent.name(), ?origin, "intent applied");
        }

        let commit = Commit {
            origin,
            intent: intent.name(),
            needs_push: intent.needs_push(),
            state: next.clone(),
        };
        for listener in listeners.iter() {
            listener(&commit);
        }
        let _ = self.commits.send(commit);

        next
    }

    /// Owned copy of the current document.
    pub fn snapshot(&self) -> MatchState {
        self.state.borrow().clone()
    }

    /// Register a listener invoked after every committed apply.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Commit) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Receiver always holding the latest document.
    pub fn watch(&self) -> watch::Receiver<MatchState> {
        self.state.subscribe()
    }

    /// Stream of commit records, used by the sync engine to tell edits apart.
    pub fn commits(&self) -> broadcast::Receiver<Commit> {
        self.commits.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::state::match_state::Side;

    #[test]
    fn apply_updates_snapshot_and_notifies_listeners() {
        let store = MatchStateStore::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        store.subscribe(move |commit| {
            assert_eq!(commit.state.home_team.score, 1);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let next = store.apply(
            Intent::SetScore {
                side: Side::Home,
                value: 1,
            },
            IntentOrigin::Local,
        );

        assert_eq!(next.home_team.score, 1);
        assert_eq!(store.snapshot(), next);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn commits_carry_origin_and_push_flag() {
        let store = MatchStateStore::default();
        let mut commits = store.commits();

        store.apply(Intent::StartClock, IntentOrigin::Local);
        store.apply(Intent::Tick, IntentOrigin::TimeDerived);
        store.apply(Intent::Load(MatchState::default()), IntentOrigin::External);

        let first = commits.recv().await.unwrap();
        assert!(first.is_local_edit());
        assert_eq!(first.intent, "start_clock");

        let second = commits.recv().await.unwrap();
        assert!(!second.is_local_edit());
        assert_eq!(second.state.timer.seconds, 1);

        let third = commits.recv().await.unwrap();
        assert_eq!(third.origin, IntentOrigin::External);
        assert!(!third.is_local_edit());
    }

    #[test]
    fn update_resolves_against_the_current_document() {
        let store = MatchStateStore::default();
        store.apply(Intent::SetExtraTime(2), IntentOrigin::Local);

        let next = store.update(
            |current| Intent::SetExtraTime(i64::from(current.extra_time) + 3),
            IntentOrigin::Local,
        );
        assert_eq!(next.extra_time, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_updates_are_not_lost() {
        let store = Arc::new(MatchStateStore::default());
        let tasks: Vec<_> = (0..2000)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.update(
                        |current| Intent::SetScore {
                            side: Side::Away,
                            value: i64::from(current.away_team.score) + 1,
                        },
                        IntentOrigin::Local,
                    );
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.snapshot().away_team.score, 2000);
    }

    #[tokio::test]
    async fn watchers_see_the_latest_document() {
        let store = MatchStateStore::default();
        let mut rx = store.watch();
        store.apply(Intent::TogglePenalties, IntentOrigin::Local);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().penalties.active);
    }
}
