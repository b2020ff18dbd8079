//! Response parsing for the handful of Kubernetes endpoints the controller touches.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::error::{KubeResult, KubernetesError};

/// Liveness of the game server as reported by its status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// Status endpoint answered 200.
    Online {
        /// Game version reported by the server.
        version: String,
        /// Players currently connected.
        players: u32,
    },
    /// Status endpoint answered 503.
    Offline,
}

impl ServerStatus {
    /// Player count, `None` while offline.
    pub fn num_players(&self) -> Option<u32> {
        match self {
            ServerStatus::Online { players, .. } => Some(*players),
            ServerStatus::Offline => None,
        }
    }

    /// One-line summary for operators.
    pub fn info(&self) -> String {
        match self {
            ServerStatus::Online { version, players } => {
                format!("Server online (v{version}), players: {players}")
            }
            ServerStatus::Offline => "Server offline".to_string(),
        }
    }
}

/// Coarse lifecycle of the game server pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodStatus {
    /// The pod does not exist.
    NoPod,
    /// Pending, waiting or terminated, with the reason.
    Transitioning(String),
    /// The container is running.
    Running,
}

impl PodStatus {
    /// One-line summary for operators.
    pub fn info(&self) -> String {
        match self {
            PodStatus::NoPod => "No Pod".to_string(),
            PodStatus::Transitioning(info) => info.clone(),
            PodStatus::Running => "Running".to_string(),
        }
    }
}

/// Desired and observed replica counts of the StatefulSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaCounts {
    /// `spec.replicas`.
    pub desired: u32,
    /// `status.replicas`, zero when absent.
    pub running: u32,
}

/// Raw answer from the gateway, kept around so errors can quote the body.
#[derive(Debug, Clone)]
pub struct KubernetesResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status.
    pub status: StatusCode,
    /// Raw response body.
    pub body: String,
}

impl KubernetesResponse {
    /// Capture a response.
    pub fn new(url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Error quoting this response.
    pub fn error(&self) -> KubernetesError {
        KubernetesError::UnexpectedStatus {
            url: self.url.clone(),
            status: self.status,
            body: self.body.clone(),
        }
    }

    /// Fail unless the status is `expected`.
    pub fn assert_status(&self, expected: StatusCode) -> KubeResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> KubeResult<T> {
        serde_json::from_str(&self.body).map_err(|source| KubernetesError::Decode {
            url: self.url.clone(),
            body: self.body.clone(),
            source,
        })
    }

    /// Interpret a status endpoint response.
    pub fn server_status(&self) -> KubeResult<ServerStatus> {
        match self.status {
            StatusCode::OK => {
                let StatusDocument { version, players } = self.json()?;
                Ok(ServerStatus::Online { version, players })
            }
            StatusCode::SERVICE_UNAVAILABLE => Ok(ServerStatus::Offline),
            _ => Err(self.error()),
        }
    }

    /// Interpret a pod GET response.
    pub fn pod_status(&self) -> KubeResult<PodStatus> {
        if self.status == StatusCode::NOT_FOUND {
            return Ok(PodStatus::NoPod);
        }
        self.assert_status(StatusCode::OK)?;

        let pod: PodDocument = self.json()?;
        let Some(container) = pod
            .status
            .and_then(|status| status.container_statuses)
            .and_then(|statuses| statuses.into_iter().next())
        else {
            return Ok(PodStatus::Transitioning("Pending".to_string()));
        };

        let state = container.state;
        if let Some(waiting) = state.waiting {
            return Ok(PodStatus::Transitioning(format!(
                "Waiting: {}",
                waiting.reason.unwrap_or_default()
            )));
        }
        if let Some(terminated) = state.terminated {
            return Ok(PodStatus::Transitioning(format!(
                "Terminated: {}",
                terminated.reason.unwrap_or_default()
            )));
        }
        if state.running.is_some() {
            return Ok(PodStatus::Running);
        }

        Err(KubernetesError::UnrecognizedPod {
            url: self.url.clone(),
            body: self.body.clone(),
        })
    }

    /// Interpret a StatefulSet GET response.
    pub fn replica_counts(&self) -> KubeResult<ReplicaCounts> {
        self.assert_status(StatusCode::OK)?;
        let set: StatefulSetDocument = self.json()?;
        Ok(ReplicaCounts {
            desired: set.spec.replicas,
            // The API omits `status.replicas` once the set has scaled to zero.
            running: set.status.and_then(|status| status.replicas).unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    version: String,
    players: u32,
}

#[derive(Debug, Deserialize)]
struct PodDocument {
    #[serde(default)]
    status: Option<PodStatusDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatusDocument {
    #[serde(default)]
    container_statuses: Option<Vec<ContainerStatusDocument>>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatusDocument {
    #[serde(default)]
    state: ContainerStateDocument,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerStateDocument {
    #[serde(default)]
    waiting: Option<StateReason>,
    #[serde(default)]
    terminated: Option<StateReason>,
    #[serde(default)]
    running: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StateReason {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatefulSetDocument {
    spec: StatefulSetSpec,
    #[serde(default)]
    status: Option<StatefulSetStatus>,
}

#[derive(Debug, Deserialize)]
struct StatefulSetSpec {
    replicas: u32,
}

#[derive(Debug, Deserialize)]
struct StatefulSetStatus {
    #[serde(default)]
    replicas: Option<u32>,
}

/// Body of the strategic-merge patch sent to the `scale` subresource.
#[derive(Debug, Serialize)]
pub struct ScalePatch {
    /// Patched part of the scale subresource.
    pub spec: ScaleSpec,
}

/// `spec` of a scale patch.
#[derive(Debug, Serialize)]
pub struct ScaleSpec {
    /// Desired replica count.
    pub replicas: u32,
}

impl ScalePatch {
    /// Patch setting the replica count.
    pub fn replicas(replicas: u32) -> Self {
        Self {
            spec: ScaleSpec { replicas },
        }
    }
}
