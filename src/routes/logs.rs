use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::logs::{LogEntryDto, LogQuery},
    error::AppError,
    services::control_service::{self, LogKind},
    state::SharedState,
};

/// Read-only access to the actor and idle shutdown logs.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/logs/actor", get(actor_log))
        .route("/logs/idle-shutdown", get(idle_shutdown_log))
}

async fn read(
    state: &SharedState,
    kind: LogKind,
    query: LogQuery,
) -> Result<Json<Vec<LogEntryDto>>, AppError> {
    query.validate()?;
    let entries =
        control_service::read_log(state, kind, query.newest_first(), query.limit).await?;
    Ok(Json(entries.into_iter().map(LogEntryDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/logs/actor",
    tag = "logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Who started or stopped the server", body = [LogEntryDto]),
        (status = 400, description = "Invalid query"),
        (status = 404, description = "Actor log is disabled")
    )
)]
/// List actor log entries.
pub async fn actor_log(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<LogEntryDto>>, AppError> {
    read(&state, LogKind::Actor, query).await
}

#[utoipa::path(
    get,
    path = "/logs/idle-shutdown",
    tag = "logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Observations and idle shutdowns", body = [LogEntryDto]),
        (status = 400, description = "Invalid query"),
        (status = 404, description = "Idle shutdown log is disabled")
    )
)]
/// List idle shutdown log entries.
pub async fn idle_shutdown_log(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<LogEntryDto>>, AppError> {
    read(&state, LogKind::IdleShutdown, query).await
}
