//! Operator gestures turned into intents on the local store.

use std::sync::Arc;

use crate::{
    error::ServiceError,
    services::sync_engine::SyncHandle,
    state::{
        intents::{Intent, IntentOrigin},
        match_state::{ClockField, MatchState, Period, Side},
        store::MatchStateStore,
    },
};

/// Entry point used by the control surface to edit the match.
///
/// Relative gestures ("+1 goal") are resolved against the current document
/// inside the store's apply section; the store clamps the resulting targets.
#[derive(Clone)]
pub struct IntentDispatcher {
    store: Arc<MatchStateStore>,
    sync: SyncHandle,
}

impl IntentDispatcher {
    /// Build a dispatcher over the shared store and the engine handle.
    pub fn new(store: Arc<MatchStateStore>, sync: SyncHandle) -> Self {
        Self { store, sync }
    }

    /// Apply a locally emitted intent.
    pub fn dispatch(&self, intent: Intent) -> MatchState {
        self.store.apply(intent, IntentOrigin::Local)
    }

    fn dispatch_with(&self, resolve: impl FnOnce(&MatchState) -> Intent) -> MatchState {
        self.store.update(resolve, IntentOrigin::Local)
    }

    /// Add `delta` goals to a team.
    pub fn adjust_score(&self, side: Side, delta: i64) -> MatchState {
        self.dispatch_with(|current| Intent::SetScore {
            side,
            value: i64::from(current.team(side).score).saturating_add(delta),
        })
    }

    /// Set the number of red cards shown for a team.
    pub fn set_red_cards(&self, side: Side, count: i64) -> MatchState {
        self.dispatch(Intent::SetRedCards { side, value: count })
    }

    /// Rename a team.
    pub fn rename_team(&self, side: Side, name: &str) -> MatchState {
        self.dispatch(Intent::SetName {
            side,
            name: name.to_owned(),
        })
    }

    /// Replace or clear a team logo.
    pub fn set_logo(&self, side: Side, logo: Option<String>) -> MatchState {
        self.dispatch(Intent::SetLogo { side, logo })
    }

    /// Start the clock when stopped, stop it when running.
    pub fn toggle_clock(&self) -> MatchState {
        self.dispatch_with(|current| {
            if current.timer.is_running {
                Intent::StopClock
            } else {
                Intent::StartClock
            }
        })
    }

    /// Nudge the minutes or seconds of the clock.
    pub fn adjust_clock(&self, field: ClockField, delta: i64) -> MatchState {
        self.dispatch(Intent::AdjustClock { field, delta })
    }

    /// Zero and stop the clock.
    pub fn reset_clock(&self) -> MatchState {
        self.dispatch(Intent::ResetClock)
    }

    /// Switch the displayed period.
    pub fn set_period(&self, period: Period) -> MatchState {
        self.dispatch(Intent::SetPeriod(period))
    }

    /// Add `delta` minutes of announced extra time.
    pub fn adjust_extra_time(&self, delta: i64) -> MatchState {
        self.dispatch_with(|current| {
            Intent::SetExtraTime(i64::from(current.extra_time).saturating_add(delta))
        })
    }

    /// Show or hide the penalty shootout.
    pub fn toggle_penalties(&self) -> MatchState {
        self.dispatch(Intent::TogglePenalties)
    }

    /// Add `delta` converted penalties to a team.
    pub fn adjust_penalty_score(&self, side: Side, delta: i64) -> MatchState {
        self.dispatch_with(|current| Intent::SetPenaltyScore {
            side,
            value: i64::from(current.penalty_score(side)).saturating_add(delta),
        })
    }

    /// Reset the whole match and persist the default immediately.
    pub async fn reset(&self) -> Result<MatchState, ServiceError> {
        self.sync.reset().await
    }

    /// Reload the match from the active backend.
    pub async fn refresh(&self) -> Result<MatchState, ServiceError> {
        self.sync.refresh().await
    }

    /// Current document.
    pub fn snapshot(&self) -> MatchState {
        self.store.snapshot()
    }
}
