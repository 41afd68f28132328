use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::intent::ControlIntent,
    error::AppError,
    services::intent_service,
    state::{SharedState, match_state::MatchState},
};

/// Apply an operator gesture and return the resulting match document.
pub async fn post_intent(
    State(state): State<SharedState>,
    Json(payload): Json<ControlIntent>,
) -> Result<Json<MatchState>, AppError> {
    let match_state = intent_service::apply_control_intent(state.dispatcher(), payload)?;
    Ok(Json(match_state))
}

/// Configure the intent routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/intents", post(post_intent))
}
