use tracing::info;
use validator::Validate;

use crate::{
    dto::intent::ControlIntent,
    error::ServiceError,
    services::dispatcher::IntentDispatcher,
    state::match_state::MatchState,
};

/// Validate a control intent and apply it through the dispatcher.
pub fn apply_control_intent(
    dispatcher: &IntentDispatcher,
    intent: ControlIntent,
) -> Result<MatchState, ServiceError> {
    intent
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let state = match intent {
        ControlIntent::Score(input) => dispatcher.adjust_score(input.side, input.delta),
        ControlIntent::RedCards(input) => dispatcher.set_red_cards(input.side, input.count),
        ControlIntent::Name(input) => dispatcher.rename_team(input.side, &input.name),
        ControlIntent::Logo(input) => {
            info!(side = ?input.side, cleared = input.logo.is_none(), "team logo updated");
            dispatcher.set_logo(input.side, input.logo)
        }
        ControlIntent::ToggleClock => dispatcher.toggle_clock(),
        ControlIntent::AdjustClock(input) => dispatcher.adjust_clock(input.field, input.delta),
        ControlIntent::ResetClock => dispatcher.reset_clock(),
        ControlIntent::Period(input) => dispatcher.set_period(input.code),
        ControlIntent::ExtraTime(input) => dispatcher.adjust_extra_time(input.delta),
        ControlIntent::TogglePenalties => dispatcher.toggle_penalties(),
        ControlIntent::PenaltyScore(input) => {
            dispatcher.adjust_penalty_score(input.side, input.delta)
        }
    };

    Ok(state)
}
