use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    dto::{idle::IdleCheckResponse, status::StatusResponse},
    error::AppError,
    services::{control_service, shutdown_service},
    state::SharedState,
};

const CONNECTING_IP_HEADER: &str = "cf-connecting-ip";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const UNKNOWN_ACTOR: &str = "Unknown IP";

/// Start/stop controls and the manual idle check.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/idle-check", post(idle_check))
}

/// Client address as reported by the proxy in front of the controller.
pub fn actor_from_headers(headers: &HeaderMap) -> String {
    let value_of = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    value_of(CONNECTING_IP_HEADER)
        .or_else(|| {
            value_of(FORWARDED_FOR_HEADER)
                .and_then(|value| value.split(',').next())
                .map(str::trim)
        })
        .unwrap_or(UNKNOWN_ACTOR)
        .to_string()
}

fn redirect_home() -> impl IntoResponse {
    (StatusCode::SEE_OTHER, [(header::LOCATION, "/")])
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "control",
    responses(
        (status = 200, description = "Cluster, game server and log overview", body = StatusResponse),
        (status = 502, description = "Kubernetes gateway or game server failed")
    )
)]
/// Report pod state, replica counts, player count, and recent log entries.
pub async fn status(State(state): State<SharedState>) -> Result<Json<StatusResponse>, AppError> {
    let overview = control_service::overview(&state).await?;
    Ok(Json(overview.into()))
}

#[utoipa::path(
    post,
    path = "/start",
    tag = "control",
    responses(
        (status = 303, description = "Server scaled to one replica"),
        (status = 502, description = "Scaling request failed")
    )
)]
/// Scale the game server up.
pub async fn start(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    control_service::start(&state, &actor_from_headers(&headers)).await?;
    Ok(redirect_home())
}

#[utoipa::path(
    post,
    path = "/stop",
    tag = "control",
    responses(
        (status = 303, description = "Server scaled to zero replicas"),
        (status = 502, description = "Scaling request failed")
    )
)]
/// Scale the game server down.
pub async fn stop(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    control_service::stop(&state, &actor_from_headers(&headers)).await?;
    Ok(redirect_home())
}

#[utoipa::path(
    post,
    path = "/idle-check",
    tag = "control",
    responses(
        (status = 200, description = "Idle check completed", body = IdleCheckResponse),
        (status = 404, description = "Idle shutdown is disabled"),
        (status = 502, description = "Kubernetes gateway or game server failed")
    )
)]
/// Run one idle check immediately instead of waiting for the scheduler.
pub async fn idle_check(
    State(state): State<SharedState>,
) -> Result<Json<IdleCheckResponse>, AppError> {
    let outcome = shutdown_service::observe_and_possibly_shutdown(&state).await?;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn cloudflare_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTING_IP_HEADER, HeaderValue::from_static("198.51.100.4"));
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("10.0.0.1"));
        assert_eq!(actor_from_headers(&headers), "198.51.100.4");
    }

    #[test]
    fn forwarded_for_uses_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(actor_from_headers(&headers), "203.0.113.9");
    }

    #[test]
    fn missing_headers_fall_back() {
        assert_eq!(actor_from_headers(&HeaderMap::new()), "Unknown IP");
    }
}
