use axum::Router;

use crate::state::SharedState;

pub mod health;
pub mod intents;
pub mod state;

/// Compose all route trees, wiring in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(state::router())
        .merge(intents::router())
        .with_state(state)
}
