use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::{
        kubernetes::{PodStatus, ReplicaCounts, ServerStatus},
        models::{LogEntry, Observation},
    },
    services::control_service::ServerOverview,
};

use super::{format_millis, logs::LogEntryDto};

/// Pod lifecycle as shown to operators.
#[derive(Debug, Serialize, ToSchema)]
pub struct PodStatusDto {
    /// One of `no_pod`, `transitioning` or `running`.
    pub kind: String,
    pub info: String,
}

impl From<&PodStatus> for PodStatusDto {
    fn from(status: &PodStatus) -> Self {
        let kind = match status {
            PodStatus::NoPod => "no_pod",
            PodStatus::Transitioning(_) => "transitioning",
            PodStatus::Running => "running",
        };
        Self {
            kind: kind.to_string(),
            info: status.info(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReplicasDto {
    pub desired: u32,
    pub running: u32,
}

impl From<ReplicaCounts> for ReplicasDto {
    fn from(counts: ReplicaCounts) -> Self {
        Self {
            desired: counts.desired,
            running: counts.running,
        }
    }
}

/// Game server liveness and player count.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameServerDto {
    pub online: bool,
    pub version: Option<String>,
    pub players: Option<u32>,
    pub info: String,
}

impl From<&ServerStatus> for GameServerDto {
    fn from(status: &ServerStatus) -> Self {
        let version = match status {
            ServerStatus::Online { version, .. } => Some(version.clone()),
            ServerStatus::Offline => None,
        };
        Self {
            online: version.is_some(),
            version,
            players: status.num_players(),
            info: status.info(),
        }
    }
}

/// Last stored player-count observation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDto {
    pub instant: i64,
    pub timestamp: String,
    /// `null` while the server was offline.
    pub num_players: Option<u32>,
}

impl From<Observation> for ObservationDto {
    fn from(observation: Observation) -> Self {
        Self {
            instant: observation.instant,
            timestamp: format_millis(observation.instant),
            num_players: observation.num_players,
        }
    }
}

/// Response body of `GET /status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub pod: PodStatusDto,
    pub replicas: ReplicasDto,
    pub server: GameServerDto,
    pub observation: Option<ObservationDto>,
    /// Idle threshold in seconds, absent when idle shutdown is disabled.
    pub idle_shutdown_after_secs: Option<u64>,
    /// Newest entries first; absent when the actor log is disabled.
    pub actor_log: Option<Vec<LogEntryDto>>,
    /// Newest entries first; absent when the idle shutdown log is disabled.
    pub idle_shutdown_log: Option<Vec<LogEntryDto>>,
}

fn entries(entries: Option<Vec<LogEntry>>) -> Option<Vec<LogEntryDto>> {
    entries.map(|entries| entries.into_iter().map(LogEntryDto::from).collect())
}

impl From<ServerOverview> for StatusResponse {
    fn from(overview: ServerOverview) -> Self {
        Self {
            pod: (&overview.pod).into(),
            replicas: overview.replicas.into(),
            server: (&overview.server).into(),
            observation: overview.observation.map(ObservationDto::from),
            idle_shutdown_after_secs: overview.idle_shutdown_after.map(|after| after.as_secs()),
            actor_log: entries(overview.actor_log),
            idle_shutdown_log: entries(overview.idle_shutdown_log),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn transitioning_pod_keeps_its_reason() {
        let dto = PodStatusDto::from(&PodStatus::Transitioning("ContainerCreating".into()));
        assert_eq!(dto.kind, "transitioning");
        assert_eq!(dto.info, "ContainerCreating");
    }

    #[test]
    fn offline_observation_serializes_null_players() {
        let dto = ObservationDto::from(Observation {
            instant: 0,
            num_players: None,
        });
        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({"instant": 0, "timestamp": "1970-01-01T00:00:00Z", "numPlayers": null})
        );
    }
}
