use std::sync::Arc;

use crate::{
    config::{AppConfig, IdleTimeout},
    dao::{
        kubernetes::GameServerApi, kv_store::KvStore, models::TtlSeconds,
        observation::ObservationRepository,
    },
    error::ServiceError,
    services::kv_logger::KvLogger,
};

/// Key prefix of the log recording who started or stopped the server.
pub const ACTOR_LOG_PREFIX: &str = "actor-log/";
/// Key prefix of the log recording idle observations and shutdowns.
pub const IDLE_SHUTDOWN_LOG_PREFIX: &str = "idle-shutdown-log/";

/// Cheaply cloneable handle on [`AppState`].
pub type SharedState = Arc<AppState>;

/// Optional features of the controller, each disabled when its value is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlOptions {
    /// Enables the actor log with this TTL.
    pub actor_log_ttl: Option<TtlSeconds>,
    /// Enables idle shutdown with this threshold.
    pub idle_shutdown_after: Option<IdleTimeout>,
    /// Enables the idle shutdown log with this TTL.
    pub idle_shutdown_log_ttl: Option<TtlSeconds>,
}

impl From<&AppConfig> for ControlOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            actor_log_ttl: config.actor_log_ttl,
            idle_shutdown_after: config.idle_shutdown_after,
            idle_shutdown_log_ttl: config.idle_shutdown_log_ttl,
        }
    }
}

/// Central application state holding the store and cluster handles.
pub struct AppState {
    kv: Arc<dyn KvStore>,
    server: Arc<dyn GameServerApi>,
    observations: ObservationRepository,
    actor_logger: Option<KvLogger>,
    idle_shutdown_logger: Option<KvLogger>,
    idle_shutdown_after: Option<IdleTimeout>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        kv: Arc<dyn KvStore>,
        server: Arc<dyn GameServerApi>,
        options: ControlOptions,
    ) -> SharedState {
        let logger = |prefix: &str, ttl: Option<TtlSeconds>| {
            ttl.map(|ttl| KvLogger::new(kv.clone(), prefix, ttl))
        };

        Arc::new(Self {
            observations: ObservationRepository::new(kv.clone()),
            actor_logger: logger(ACTOR_LOG_PREFIX, options.actor_log_ttl),
            idle_shutdown_logger: logger(IDLE_SHUTDOWN_LOG_PREFIX, options.idle_shutdown_log_ttl),
            idle_shutdown_after: options.idle_shutdown_after,
            server,
            kv,
        })
    }

    /// Backing key-value store.
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Cluster access for the game server.
    pub fn server(&self) -> &Arc<dyn GameServerApi> {
        &self.server
    }

    /// Repository of the last observation.
    pub fn observations(&self) -> &ObservationRepository {
        &self.observations
    }

    /// Actor log, when enabled.
    pub fn actor_logger(&self) -> Option<&KvLogger> {
        self.actor_logger.as_ref()
    }

    /// Idle shutdown log, when enabled.
    pub fn idle_shutdown_logger(&self) -> Option<&KvLogger> {
        self.idle_shutdown_logger.as_ref()
    }

    /// Idle threshold, when enabled.
    pub fn idle_shutdown_after(&self) -> Option<IdleTimeout> {
        self.idle_shutdown_after
    }

    /// Idle threshold, or an error when idle shutdown is disabled.
    pub fn require_idle_shutdown(&self) -> Result<IdleTimeout, ServiceError> {
        self.idle_shutdown_after
            .ok_or(ServiceError::NotConfigured("idle shutdown"))
    }
}
