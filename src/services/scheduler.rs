use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::{services::shutdown_service, state::SharedState};

/// Run an idle check every `period` until the task is dropped.
///
/// A failed cycle is logged and the next tick proceeds as usual.
pub async fn run(state: SharedState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_secs = period.as_secs(), "idle shutdown checks scheduled");

    loop {
        ticker.tick().await;
        match shutdown_service::observe_and_possibly_shutdown(&state).await {
            Ok(outcome) if outcome.shutdown => {
                info!(num_players = ?outcome.observation.num_players, "idle server scaled to zero")
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "idle check failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::IdleTimeout,
        dao::{kv_store::MemoryKvStore, models::Observation},
        state::{AppState, ControlOptions},
        test_support::FakeServer,
    };

    #[tokio::test(start_paused = true)]
    async fn ticks_keep_running_after_failures() {
        let server = Arc::new(FakeServer::failing_scale(0));
        let state = AppState::new(
            Arc::new(MemoryKvStore::new()),
            server.clone(),
            ControlOptions {
                idle_shutdown_after: Some(IdleTimeout::from_secs(60)),
                ..ControlOptions::default()
            },
        );
        let stale = Observation {
            instant: 0,
            num_players: Some(0),
        };
        state.observations().put(stale).await.unwrap();

        let task = tokio::spawn(run(state.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(150)).await;
        task.abort();

        // Ticks at 0s, 60s and 120s each try to scale down and fail.
        assert!(server.scales().len() >= 2, "scales: {:?}", server.scales());
        assert_eq!(state.observations().get().await.unwrap(), Some(stale));
    }
}
