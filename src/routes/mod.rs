use axum::Router;

use crate::state::SharedState;

/// Start, stop, status and idle check.
pub mod control;
/// Swagger UI.
pub mod docs;
/// Health check.
pub mod health;
/// Log listings.
pub mod logs;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(control::router())
        .merge(logs::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
