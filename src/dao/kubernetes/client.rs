use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, header};

use super::{
    GameServerApi,
    error::{KubeResult, KubernetesError},
    models::{KubernetesResponse, PodStatus, ReplicaCounts, ScalePatch, ServerStatus},
};

const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Coordinates of the game server inside the cluster and how to reach the API.
#[derive(Debug, Clone)]
pub struct KubernetesConfig {
    /// Base URL of the API gateway.
    pub gateway: String,
    /// Bearer token sent with every request.
    pub token: String,
    /// Namespace of the game server resources.
    pub namespace: String,
    /// StatefulSet running the game server.
    pub stateful_set_name: String,
    /// Pod of the StatefulSet.
    pub pod_name: String,
    /// Service exposing the server status endpoint.
    pub odin_name: String,
}

/// reqwest-based client talking to the Kubernetes API through a bearer-token gateway.
#[derive(Clone)]
pub struct KubernetesClient {
    client: Client,
    config: Arc<KubernetesConfig>,
}

impl KubernetesClient {
    /// Build a client; a trailing slash on the gateway is dropped.
    pub fn new(mut config: KubernetesConfig) -> KubeResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| KubernetesError::ClientBuilder { source })?;
        config.gateway = config.gateway.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn pod_path(&self) -> String {
        format!(
            "/api/v1/namespaces/{}/pods/{}",
            self.config.namespace, self.config.pod_name
        )
    }

    fn stateful_set_path(&self) -> String {
        format!(
            "/apis/apps/v1/namespaces/{}/statefulsets/{}",
            self.config.namespace, self.config.stateful_set_name
        )
    }

    fn status_path(&self) -> String {
        format!(
            "/api/v1/namespaces/{}/services/{}/proxy/status",
            self.config.namespace, self.config.odin_name
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        patch: Option<&ScalePatch>,
    ) -> KubeResult<KubernetesResponse> {
        let url = format!("{}{}", self.config.gateway, path);
        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(&self.config.token)
            .header(header::ACCEPT, "application/json");
        if let Some(patch) = patch {
            // `json` keeps an explicit content type.
            builder = builder
                .header(header::CONTENT_TYPE, STRATEGIC_MERGE_PATCH)
                .json(patch);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| KubernetesError::RequestSend {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| KubernetesError::RequestSend {
                url: url.clone(),
                source,
            })?;

        Ok(KubernetesResponse::new(url, status, body))
    }
}

impl GameServerApi for KubernetesClient {
    fn server_status(&self) -> BoxFuture<'static, KubeResult<ServerStatus>> {
        let client = self.clone();
        Box::pin(async move {
            let path = client.status_path();
            client.send(Method::GET, &path, None).await?.server_status()
        })
    }

    fn pod_status(&self) -> BoxFuture<'static, KubeResult<PodStatus>> {
        let client = self.clone();
        Box::pin(async move {
            let path = client.pod_path();
            client.send(Method::GET, &path, None).await?.pod_status()
        })
    }

    fn replica_counts(&self) -> BoxFuture<'static, KubeResult<ReplicaCounts>> {
        let client = self.clone();
        Box::pin(async move {
            let path = client.stateful_set_path();
            client.send(Method::GET, &path, None).await?.replica_counts()
        })
    }

    fn scale(&self, replicas: u32) -> BoxFuture<'static, KubeResult<()>> {
        let client = self.clone();
        Box::pin(async move {
            let path = format!("{}/scale", client.stateful_set_path());
            let patch = ScalePatch::replicas(replicas);
            client
                .send(Method::PATCH, &path, Some(&patch))
                .await?
                .assert_status(StatusCode::OK)
        })
    }
}
