//! Idle detection: compare successive player-count observations and scale the
//! server down once the count has stayed put for longer than the idle threshold.
//!
//! Cycles are not mutually excluded. Two overlapping cycles may both persist an
//! observation or both scale to zero; either outcome is harmless.

use futures::future::{BoxFuture, try_join_all};
use tracing::{debug, info};

use crate::{
    config::IdleTimeout,
    dao::models::{Observation, now_millis},
    error::ServiceError,
    services::kv_logger::KvLogger,
    state::SharedState,
};

/// Observation retained after a cycle and whether it replaced the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedObservation {
    /// Observation to keep.
    pub observation: Observation,
    /// Whether it replaced the stored one.
    pub has_changed: bool,
}

/// What a single idle check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Observation retained after the cycle.
    pub observation: Observation,
    /// Whether the player count moved.
    pub changed: bool,
    /// Whether the server was scaled to zero.
    pub shutdown: bool,
}

/// Keep the older observation while the player count is unchanged, so its instant
/// marks when the count last moved.
pub fn combine_successive_observations(
    old_observation: Option<Observation>,
    new_observation: Observation,
) -> CombinedObservation {
    match old_observation {
        Some(old) if old.num_players == new_observation.num_players => CombinedObservation {
            observation: old,
            has_changed: false,
        },
        _ => CombinedObservation {
            observation: new_observation,
            has_changed: true,
        },
    }
}

/// An offline server (no player count) is never considered idle.
pub fn should_shutdown(observation: &Observation, timeout: IdleTimeout, now: i64) -> bool {
    observation.num_players.is_some() && now.saturating_sub(observation.instant) > timeout.as_millis()
}

/// Take a fresh observation from the game server's status endpoint.
pub async fn observe(state: &SharedState) -> Result<Observation, ServiceError> {
    let status = state.server().server_status().await?;
    Ok(Observation {
        instant: now_millis(),
        num_players: status.num_players(),
    })
}

/// Run one idle check: persist a changed observation and scale to zero once idle.
///
/// Side effects run concurrently and the first failure fails the cycle; effects that
/// already completed are not rolled back.
pub async fn observe_and_possibly_shutdown(
    state: &SharedState,
) -> Result<CycleOutcome, ServiceError> {
    let timeout = state.require_idle_shutdown()?;

    let (old_observation, new_observation) = tokio::try_join!(
        async { state.observations().get().await.map_err(ServiceError::from) },
        observe(state),
    )?;

    let combined = combine_successive_observations(old_observation, new_observation);
    let observation = combined.observation;
    let logger = state.idle_shutdown_logger();
    let mut pending: Vec<BoxFuture<'_, Result<(), ServiceError>>> = Vec::new();

    if combined.has_changed {
        info!(num_players = ?observation.num_players, "player count changed");
        pending.extend(log_message(logger, observed_message(&observation)));
        pending.push(Box::pin(async move {
            state.observations().put(observation).await?;
            Ok::<(), ServiceError>(())
        }));
    } else {
        debug!(num_players = ?observation.num_players, "player count unchanged");
    }

    let shutdown = should_shutdown(&observation, timeout, now_millis());
    if shutdown {
        info!(idle_secs = timeout.as_secs(), "server idle; scaling to zero");
        pending.extend(log_message(
            logger,
            format!(
                "Server has been idle for {}s, shutting down",
                timeout.as_secs()
            ),
        ));
        pending.push(Box::pin(async move {
            state.server().scale(0).await?;
            Ok::<(), ServiceError>(())
        }));
    }

    try_join_all(pending).await?;

    Ok(CycleOutcome {
        observation,
        changed: combined.has_changed,
        shutdown,
    })
}

fn observed_message(observation: &Observation) -> String {
    match observation.num_players {
        Some(players) => format!("Observed {players} players"),
        None => "Observed server offline".to_string(),
    }
}

fn log_message(
    logger: Option<&KvLogger>,
    message: String,
) -> Option<BoxFuture<'_, Result<(), ServiceError>>> {
    let logger = logger?;
    Some(Box::pin(async move {
        logger.log(message).await?;
        Ok::<(), ServiceError>(())
    }))
}
