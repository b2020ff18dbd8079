use serde::Serialize;
use utoipa::ToSchema;

use crate::services::shutdown_service::CycleOutcome;

use super::status::ObservationDto;

/// Result of a manually triggered idle check.
#[derive(Debug, Serialize, ToSchema)]
pub struct IdleCheckResponse {
    /// Observation retained after the check.
    pub observation: ObservationDto,
    /// Whether the player count moved since the previous check.
    pub changed: bool,
    /// Whether the server was scaled to zero.
    pub shutdown: bool,
}

impl From<CycleOutcome> for IdleCheckResponse {
    fn from(outcome: CycleOutcome) -> Self {
        Self {
            observation: outcome.observation.into(),
            changed: outcome.changed,
            shutdown: outcome.shutdown,
        }
    }
}
