use crate::state::match_state::{
    ClockField, MAX_EXTRA_TIME, MAX_MINUTES, MAX_RED_CARDS, MAX_SECONDS, MatchState, Period, Side,
    clamp_count, normalize_team_name,
};

/// Named mutations that can be applied to a [`MatchState`].
///
/// Counter intents carry the target value computed by the caller; the transition
/// clamps it again so an out-of-range payload can never corrupt the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Set the goals of a team.
    SetScore {
        /// Targeted team.
        side: Side,
        /// Requested score, clamped to be non-negative.
        value: i64,
    },
    /// Set the red cards of a team.
    SetRedCards {
        /// Targeted team.
        side: Side,
        /// Requested count, clamped into `0..=4`.
        value: i64,
    },
    /// Rename a team; the name is upper-cased and truncated to 4 characters.
    SetName {
        /// Targeted team.
        side: Side,
        /// Raw name as typed by the operator.
        name: String,
    },
    /// Replace or clear a team logo.
    SetLogo {
        /// Targeted team.
        side: Side,
        /// Opaque image payload.
        logo: Option<String>,
    },
    /// Start the match clock.
    StartClock,
    /// Stop the match clock.
    StopClock,
    /// Shift one clock field by a signed delta.
    AdjustClock {
        /// Field to shift.
        field: ClockField,
        /// Signed amount added before clamping.
        delta: i64,
    },
    /// Stop the clock and bring it back to 00:00.
    ResetClock,
    /// One elapsed second of running clock.
    Tick,
    /// Switch the half being played.
    SetPeriod(Period),
    /// Set the announced added time.
    SetExtraTime(i64),
    /// Show or hide the penalty shoot-out panel.
    TogglePenalties,
    /// Set the converted penalties of a team.
    SetPenaltyScore {
        /// Targeted team.
        side: Side,
        /// Requested score, clamped to be non-negative.
        value: i64,
    },
    /// Replace the whole document verbatim.
    Load(MatchState),
}

impl Intent {
    /// Stable identifier used in logs and commit records.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SetScore { .. } => "set_score",
            Intent::SetRedCards { .. } => "set_red_cards",
            Intent::SetName { .. } => "set_name",
            Intent::SetLogo { .. } => "set_logo",
            Intent::StartClock => "start_clock",
            Intent::StopClock => "stop_clock",
            Intent::AdjustClock { .. } => "adjust_clock",
            Intent::ResetClock => "reset_clock",
            Intent::Tick => "tick",
            Intent::SetPeriod(_) => "set_period",
            Intent::SetExtraTime(_) => "set_extra_time",
            Intent::TogglePenalties => "toggle_penalties",
            Intent::SetPenaltyScore { .. } => "set_penalty_score",
            Intent::Load(_) => "load",
        }
    }

    /// Whether committing this intent should be persisted to the active backend.
    ///
    /// Clock ticks are derived locally on every client and loads already come
    /// from a backend.
    pub fn needs_push(&self) -> bool {
        !matches!(self, Intent::Tick | Intent::Load(_))
    }
}

/// Where an applied intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOrigin {
    /// Emitted by an operator on this client.
    Local,
    /// Adopted from a persistence backend.
    External,
    /// Emitted by the clock ticker.
    TimeDerived,
}

/// Pure transition function of the scoreboard.
pub fn transition(state: &MatchState, intent: &Intent) -> MatchState {
    let mut next = state.clone();
    match intent {
        Intent::SetScore { side, value } => {
            next.team_mut(*side).score = clamp_count(*value, u32::MAX);
        }
        Intent::SetRedCards { side, value } => {
            next.team_mut(*side).red_cards = clamp_count(*value, MAX_RED_CARDS);
        }
        Intent::SetName { side, name } => {
            next.team_mut(*side).name = normalize_team_name(name);
        }
        Intent::SetLogo { side, logo } => {
            next.team_mut(*side).logo = logo.clone();
        }
        Intent::StartClock => next.timer.is_running = true,
        Intent::StopClock => next.timer.is_running = false,
        Intent::AdjustClock { field, delta } => match field {
            ClockField::Minutes => {
                next.timer.minutes =
                    clamp_count(i64::from(next.timer.minutes).saturating_add(*delta), MAX_MINUTES);
            }
            ClockField::Seconds => {
                next.timer.seconds =
                    clamp_count(i64::from(next.timer.seconds).saturating_add(*delta), MAX_SECONDS);
            }
        },
        Intent::ResetClock => {
            next.timer.minutes = 0;
            next.timer.seconds = 0;
            next.timer.is_running = false;
        }
        Intent::Tick => {
            let seconds = next.timer.seconds.min(MAX_SECONDS) + 1;
            if seconds > MAX_SECONDS {
                next.timer.seconds = 0;
                next.timer.minutes = next.timer.minutes.saturating_add(1).min(MAX_MINUTES);
            } else {
                next.timer.seconds = seconds;
            }
        }
        Intent::SetPeriod(period) => next.period = *period,
        Intent::SetExtraTime(value) => next.extra_time = clamp_count(*value, MAX_EXTRA_TIME),
        Intent::TogglePenalties => next.penalties.active = !next.penalties.active,
        Intent::SetPenaltyScore { side, value } => {
            let value = clamp_count(*value, u32::MAX);
            match side {
                Side::Home => next.penalties.home_score = value,
                Side::Away => next.penalties.away_score = value,
            }
        }
        Intent::Load(state) => next = state.clone(),
    }
    next
}
