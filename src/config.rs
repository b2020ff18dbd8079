//! Process configuration read once from the environment and validated eagerly.

use std::{env, time::Duration};

use thiserror::Error;

#[cfg(feature = "couch-store")]
use crate::dao::kv_store::couchdb::{CouchConfig, CouchDaoError};
use crate::dao::{kubernetes::KubernetesConfig, models::TtlSeconds};

/// Interval between two idle checks when `VALHEIMCTL_CHECK_INTERVAL` is unset.
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_PORT: u16 = 8080;

/// How long the player count may stay unchanged before the server is scaled down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdleTimeout(Duration);

impl IdleTimeout {
    /// Threshold of `secs` whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Threshold in whole seconds, as shown in log messages.
    pub fn as_secs(self) -> u64 {
        self.0.as_secs()
    }

    /// Threshold in milliseconds, saturating at `i64::MAX`.
    pub fn as_millis(self) -> i64 {
        i64::try_from(self.0.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Failures raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// A numeric variable failed to parse.
    #[error("expected a number in `{var}`, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
    /// The CouchDB backend configuration is incomplete.
    #[cfg(feature = "couch-store")]
    #[error(transparent)]
    Couch(#[from] CouchDaoError),
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Where and how to reach the game server workload.
    pub kubernetes: KubernetesConfig,
    /// TTL of start/stop log entries; the actor log is disabled when unset.
    pub actor_log_ttl: Option<TtlSeconds>,
    /// Idle threshold; idle shutdown is disabled when unset.
    pub idle_shutdown_after: Option<IdleTimeout>,
    /// TTL of idle-shutdown log entries; that log is disabled when unset.
    pub idle_shutdown_log_ttl: Option<TtlSeconds>,
    /// Period of the idle check loop.
    pub check_interval: Duration,
    /// HTTP listen port.
    pub port: u16,
    /// CouchDB backend; the in-memory store is used when unset.
    #[cfg(feature = "couch-store")]
    pub couch: Option<CouchConfig>,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var).ok_or(ConfigError::MissingEnvVar { var })
        };
        let optional_number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidNumber { var, value })
                })
                .transpose()
        };

        let kubernetes = KubernetesConfig {
            gateway: required("VALHEIMCTL_K8S_GATEWAY")?,
            token: required("VALHEIMCTL_K8S_TOKEN")?,
            namespace: required("VALHEIMCTL_NAMESPACE")?,
            stateful_set_name: required("VALHEIMCTL_STATEFUL_SET_NAME")?,
            pod_name: required("VALHEIMCTL_POD_NAME")?,
            odin_name: required("VALHEIMCTL_ODIN_NAME")?,
        };

        let port = match lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber { var: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            kubernetes,
            actor_log_ttl: optional_number("VALHEIMCTL_ACTOR_LOG_TTL")?.map(TtlSeconds),
            idle_shutdown_after: optional_number("VALHEIMCTL_IDLE_SHUTDOWN_AFTER")?
                .map(IdleTimeout::from_secs),
            idle_shutdown_log_ttl: optional_number("VALHEIMCTL_IDLE_SHUTDOWN_LOG_TTL")?
                .map(TtlSeconds),
            check_interval: optional_number("VALHEIMCTL_CHECK_INTERVAL")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CHECK_INTERVAL),
            port,
            #[cfg(feature = "couch-store")]
            couch: CouchConfig::from_lookup(&lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("VALHEIMCTL_K8S_GATEWAY", "https://k8s.example.com"),
            ("VALHEIMCTL_K8S_TOKEN", "token"),
            ("VALHEIMCTL_NAMESPACE", "valheim"),
            ("VALHEIMCTL_STATEFUL_SET_NAME", "valheim-server"),
            ("VALHEIMCTL_POD_NAME", "valheim-server-0"),
            ("VALHEIMCTL_ODIN_NAME", "odin"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|var| vars.get(var).map(|value| value.to_string()))
    }

    #[test]
    fn optional_features_default_to_disabled() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.kubernetes.namespace, "valheim");
        assert!(config.actor_log_ttl.is_none());
        assert!(config.idle_shutdown_after.is_none());
        assert!(config.idle_shutdown_log_ttl.is_none());
        assert_eq!(config.check_interval, DEFAULT_CHECK_INTERVAL);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn numbers_become_typed_values() {
        let mut vars = base_vars();
        vars.insert("VALHEIMCTL_ACTOR_LOG_TTL", "86400");
        vars.insert("VALHEIMCTL_IDLE_SHUTDOWN_AFTER", "900");
        vars.insert("VALHEIMCTL_IDLE_SHUTDOWN_LOG_TTL", "604800");
        vars.insert("VALHEIMCTL_CHECK_INTERVAL", "30");
        vars.insert("SERVER_PORT", "9000");

        let config = load(&vars).unwrap();
        assert_eq!(config.actor_log_ttl, Some(TtlSeconds(86_400)));
        assert_eq!(config.idle_shutdown_after, Some(IdleTimeout::from_secs(900)));
        assert_eq!(config.idle_shutdown_log_ttl, Some(TtlSeconds(604_800)));
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn missing_required_variable_is_reported() {
        let mut vars = base_vars();
        vars.remove("VALHEIMCTL_K8S_TOKEN");
        let err = load(&vars).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing environment variable `VALHEIMCTL_K8S_TOKEN`"
        );
    }

    #[test]
    fn malformed_number_is_reported() {
        let mut vars = base_vars();
        vars.insert("VALHEIMCTL_IDLE_SHUTDOWN_AFTER", "fifteen minutes");
        let err = load(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "VALHEIMCTL_IDLE_SHUTDOWN_AFTER",
                ..
            }
        ));
    }

    #[test]
    fn huge_idle_threshold_saturates() {
        let mut vars = base_vars();
        vars.insert("VALHEIMCTL_IDLE_SHUTDOWN_AFTER", "10000000000000000");
        let after = load(&vars).unwrap().idle_shutdown_after.unwrap();
        assert_eq!(after.as_millis(), i64::MAX);
        assert_eq!(IdleTimeout::from_secs(u64::MAX).as_millis(), i64::MAX);
    }
}
