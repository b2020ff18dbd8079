mod client;
mod error;
mod models;

use futures::future::BoxFuture;

pub use client::{KubernetesClient, KubernetesConfig};
pub use error::{KubeResult, KubernetesError};
pub use models::{KubernetesResponse, PodStatus, ReplicaCounts, ScalePatch, ServerStatus};

/// Operations the controller needs from the cluster hosting the game server.
pub trait GameServerApi: Send + Sync {
    /// Query the game server's own status endpoint through the service proxy.
    fn server_status(&self) -> BoxFuture<'static, KubeResult<ServerStatus>>;
    /// Lifecycle of the game server pod.
    fn pod_status(&self) -> BoxFuture<'static, KubeResult<PodStatus>>;
    /// Desired and running replicas of the StatefulSet.
    fn replica_counts(&self) -> BoxFuture<'static, KubeResult<ReplicaCounts>>;
    /// Set the desired replica count of the StatefulSet.
    fn scale(&self, replicas: u32) -> BoxFuture<'static, KubeResult<()>>;
}
