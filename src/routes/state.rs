use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service,
    state::{SharedState, match_state::MatchState},
};

/// Return the current match document.
pub async fn get_state(State(state): State<SharedState>) -> Json<MatchState> {
    Json(state.store().snapshot())
}

/// Stream the match document to overlays, once on connect and after every change.
pub async fn state_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (initial, receiver) = sse_service::subscribe_state(&state);
    info!("New state SSE connection");
    sse_service::to_sse_stream(initial, receiver, state.shutdown_watcher())
}

/// Reset the match to its default document on the active backend.
pub async fn reset(State(state): State<SharedState>) -> Result<Json<MatchState>, AppError> {
    info!("match reset requested");
    Ok(Json(state.dispatcher().reset().await?))
}

/// Reload the match from the active backend.
pub async fn refresh(State(state): State<SharedState>) -> Result<Json<MatchState>, AppError> {
    Ok(Json(state.dispatcher().refresh().await?))
}

/// Configure the state routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/state", get(get_state))
        .route("/state/stream", get(state_stream))
        .route("/reset", post(reset))
        .route("/refresh", post(refresh))
}
