use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Valheim controller.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::control::status,
        crate::routes::control::start,
        crate::routes::control::stop,
        crate::routes::control::idle_check,
        crate::routes::logs::actor_log,
        crate::routes::logs::idle_shutdown_log,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::status::StatusResponse,
            crate::dto::status::PodStatusDto,
            crate::dto::status::ReplicasDto,
            crate::dto::status::GameServerDto,
            crate::dto::status::ObservationDto,
            crate::dto::logs::LogEntryDto,
            crate::dto::logs::LogOrder,
            crate::dto::idle::IdleCheckResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "control", description = "Start, stop and inspect the game server"),
        (name = "logs", description = "Actor and idle shutdown logs"),
    )
)]
pub struct ApiDoc;
