use tracing::info;

use crate::{
    config::IdleTimeout,
    dao::{
        kubernetes::{PodStatus, ReplicaCounts, ServerStatus},
        models::{LogEntry, Observation},
    },
    error::ServiceError,
    services::kv_logger::KvLogger,
    state::SharedState,
};

/// Number of log entries included in the status overview.
const OVERVIEW_LOG_ENTRIES: usize = 20;

/// Which of the two logs a caller wants to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Who started or stopped the server.
    Actor,
    /// Observations and idle shutdowns.
    IdleShutdown,
}

/// Everything an operator needs to decide whether to start or stop the server.
#[derive(Debug, Clone)]
pub struct ServerOverview {
    /// Pod lifecycle.
    pub pod: PodStatus,
    /// StatefulSet replica counts.
    pub replicas: ReplicaCounts,
    /// Game server liveness.
    pub server: ServerStatus,
    /// Last stored observation.
    pub observation: Option<Observation>,
    /// Idle threshold, when enabled.
    pub idle_shutdown_after: Option<IdleTimeout>,
    /// Newest actor log entries, when enabled.
    pub actor_log: Option<Vec<LogEntry>>,
    /// Newest idle shutdown log entries, when enabled.
    pub idle_shutdown_log: Option<Vec<LogEntry>>,
}

/// Scale the server up to one replica on behalf of `actor`.
pub async fn start(state: &SharedState, actor: &str) -> Result<(), ServiceError> {
    info!(%actor, "starting server");
    scale_with_log(state, 1, format!("{actor} started the server")).await
}

/// Scale the server down to zero replicas on behalf of `actor`.
pub async fn stop(state: &SharedState, actor: &str) -> Result<(), ServiceError> {
    info!(%actor, "stopping server");
    scale_with_log(state, 0, format!("{actor} stopped the server")).await
}

async fn scale_with_log(
    state: &SharedState,
    replicas: u32,
    message: String,
) -> Result<(), ServiceError> {
    let log = async {
        if let Some(logger) = state.actor_logger() {
            logger.log(message).await?;
        }
        Ok::<(), ServiceError>(())
    };
    let scale = async {
        state
            .server()
            .scale(replicas)
            .await
            .map_err(ServiceError::from)
    };

    tokio::try_join!(log, scale)?;
    Ok(())
}

/// Gather cluster state, the last observation, and recent log entries.
pub async fn overview(state: &SharedState) -> Result<ServerOverview, ServiceError> {
    let server = state.server();
    let (pod, replicas, status, observation, actor_log, idle_shutdown_log) = tokio::try_join!(
        async { server.pod_status().await.map_err(ServiceError::from) },
        async { server.replica_counts().await.map_err(ServiceError::from) },
        async { server.server_status().await.map_err(ServiceError::from) },
        async { state.observations().get().await.map_err(ServiceError::from) },
        recent_entries(state.actor_logger()),
        recent_entries(state.idle_shutdown_logger()),
    )?;

    Ok(ServerOverview {
        pod,
        replicas,
        server: status,
        observation,
        idle_shutdown_after: state.idle_shutdown_after(),
        actor_log,
        idle_shutdown_log,
    })
}

async fn recent_entries(logger: Option<&KvLogger>) -> Result<Option<Vec<LogEntry>>, ServiceError> {
    let Some(logger) = logger else {
        return Ok(None);
    };
    let mut entries = logger.newest().await?;
    entries.truncate(OVERVIEW_LOG_ENTRIES);
    Ok(Some(entries))
}

/// Read one of the logs in the requested order, keeping at most `limit` entries.
pub async fn read_log(
    state: &SharedState,
    kind: LogKind,
    newest_first: bool,
    limit: Option<usize>,
) -> Result<Vec<LogEntry>, ServiceError> {
    let logger = match kind {
        LogKind::Actor => state.actor_logger().ok_or(ServiceError::NotConfigured("actor log"))?,
        LogKind::IdleShutdown => state
            .idle_shutdown_logger()
            .ok_or(ServiceError::NotConfigured("idle shutdown log"))?,
    };

    let mut entries = if newest_first {
        logger.newest().await?
    } else {
        logger.oldest().await?
    };
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::{kv_store::MemoryKvStore, models::TtlSeconds},
        state::{AppState, ControlOptions},
        test_support::FakeServer,
    };

    fn state_with(server: Arc<FakeServer>, options: ControlOptions) -> SharedState {
        AppState::new(Arc::new(MemoryKvStore::new()), server, options)
    }

    #[tokio::test]
    async fn start_and_stop_scale_and_log_the_actor() {
        let server = Arc::new(FakeServer::default());
        let state = state_with(
            server.clone(),
            ControlOptions {
                actor_log_ttl: Some(TtlSeconds(3600)),
                ..ControlOptions::default()
            },
        );

        start(&state, "203.0.113.7").await.unwrap();
        stop(&state, "203.0.113.7").await.unwrap();

        assert_eq!(server.scales(), [1, 0]);
        let entries = read_log(&state, LogKind::Actor, false, None).await.unwrap();
        let messages: Vec<_> = entries.iter().map(|entry| entry.message.as_str()).collect();
        assert_eq!(
            messages.len(),
            2,
            "both actions should be logged: {messages:?}"
        );
        assert!(messages.contains(&"203.0.113.7 started the server"));
        assert!(messages.contains(&"203.0.113.7 stopped the server"));
    }

    #[tokio::test]
    async fn start_without_actor_log_still_scales() {
        let server = Arc::new(FakeServer::default());
        let state = state_with(server.clone(), ControlOptions::default());

        start(&state, "Unknown IP").await.unwrap();
        assert_eq!(server.scales(), [1]);

        let err = read_log(&state, LogKind::Actor, true, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured("actor log")));
    }

    #[tokio::test]
    async fn read_log_honours_order_and_limit() {
        let state = state_with(
            Arc::new(FakeServer::default()),
            ControlOptions {
                idle_shutdown_log_ttl: Some(TtlSeconds(3600)),
                ..ControlOptions::default()
            },
        );
        let logger = state.idle_shutdown_logger().unwrap();
        for instant in [3, 1, 2] {
            logger
                .push(LogEntry::new(instant, format!("entry {instant}")))
                .await
                .unwrap();
        }

        let newest = read_log(&state, LogKind::IdleShutdown, true, Some(2))
            .await
            .unwrap();
        assert_eq!(
            newest,
            vec![LogEntry::new(3, "entry 3"), LogEntry::new(2, "entry 2")]
        );
    }

    #[tokio::test]
    async fn overview_skips_disabled_logs() {
        let state = state_with(Arc::new(FakeServer::default()), ControlOptions::default());
        let overview = overview(&state).await.unwrap();
        assert_eq!(overview.pod, PodStatus::Running);
        assert_eq!(overview.server, ServerStatus::Offline);
        assert!(overview.observation.is_none());
        assert!(overview.actor_log.is_none());
        assert!(overview.idle_shutdown_log.is_none());
    }
}
