//! Drives the match clock while it is running.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info};

use crate::state::{
    intents::{Intent, IntentOrigin},
    store::MatchStateStore,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Spawn the process-wide clock ticker.
pub fn spawn(store: Arc<MatchStateStore>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(run(store, shutdown))
}

/// Dispatch one time-derived [`Intent::Tick`] per elapsed second while the
/// clock runs.
///
/// The running flag is read from the store, so a clock started by a reloaded
/// document keeps ticking without any local gesture.
pub async fn run(store: Arc<MatchStateStore>, mut shutdown: watch::Receiver<bool>) {
    let mut states = store.watch();

    loop {
        let running = states.borrow_and_update().timer.is_running;

        if running {
            debug!("clock started");
            let mut ticks = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("clock ticker stopped");
                            return;
                        }
                    }
                    changed = states.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if !states.borrow_and_update().timer.is_running {
                            debug!("clock stopped");
                            break;
                        }
                    }
                    _ = ticks.tick() => {
                        store.apply(Intent::Tick, IntentOrigin::TimeDerived);
                    }
                }
            }
        } else {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("clock ticker stopped");
                        return;
                    }
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_state::{ClockField, MatchState};

    async fn pass(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn start() -> (Arc<MatchStateStore>, watch::Sender<bool>, JoinHandle<()>) {
        let store = Arc::new(MatchStateStore::default());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = spawn(store.clone(), shutdown_rx);
        (store, shutdown, task)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_while_running() {
        let (store, shutdown, task) = start();
        pass(Duration::from_millis(10)).await;

        store.apply(Intent::StartClock, IntentOrigin::Local);
        pass(Duration::from_millis(3_500)).await;
        assert_eq!(store.snapshot().timer.seconds, 3);

        store.apply(Intent::StopClock, IntentOrigin::Local);
        pass(Duration::from_secs(5)).await;
        assert_eq!(store.snapshot().timer.seconds, 3);

        shutdown.send_replace(true);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn carries_seconds_into_minutes() {
        let (store, shutdown, task) = start();
        store.apply(
            Intent::AdjustClock {
                field: ClockField::Seconds,
                delta: 58,
            },
            IntentOrigin::Local,
        );
        store.apply(Intent::StartClock, IntentOrigin::Local);
        pass(Duration::from_millis(2_100)).await;

        let timer = store.snapshot().timer;
        assert_eq!((timer.minutes, timer.seconds), (1, 0));

        shutdown.send_replace(true);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_running_clock_keeps_ticking() {
        let (store, shutdown, task) = start();
        pass(Duration::from_millis(10)).await;

        let mut loaded = MatchState::default();
        loaded.timer.minutes = 45;
        loaded.timer.is_running = true;
        store.apply(Intent::Load(loaded), IntentOrigin::External);
        pass(Duration::from_millis(2_500)).await;

        let timer = store.snapshot().timer;
        assert_eq!((timer.minutes, timer.seconds), (45, 2));

        shutdown.send_replace(true);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn starting_twice_does_not_double_the_rate() {
        let (store, shutdown, task) = start();
        pass(Duration::from_millis(10)).await;

        store.apply(Intent::StartClock, IntentOrigin::Local);
        pass(Duration::from_millis(500)).await;
        store.apply(Intent::StartClock, IntentOrigin::Local);
        pass(Duration::from_millis(1_700)).await;

        assert_eq!(store.snapshot().timer.seconds, 2);

        shutdown.send_replace(true);
        task.await.unwrap();
    }
}
