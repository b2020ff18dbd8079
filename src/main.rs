//! valheimctl binary entrypoint wiring configuration, storage, the Kubernetes client,
//! the idle-shutdown scheduler, and the REST layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valheimctl::{
    config::AppConfig,
    dao::{
        kubernetes::KubernetesClient,
        kv_store::{KvStore, MemoryKvStore},
    },
    routes,
    services::scheduler,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("reading configuration")?;
    let kv = connect_store(&config).await?;
    let server = KubernetesClient::new(config.kubernetes.clone())
        .context("building Kubernetes client")?;

    let app_state = AppState::new(kv, Arc::new(server), (&config).into());

    match config.idle_shutdown_after {
        Some(after) => {
            info!(
                idle_secs = after.as_secs(),
                check_secs = config.check_interval.as_secs(),
                "idle shutdown enabled"
            );
            tokio::spawn(scheduler::run(app_state.clone(), config.check_interval));
        }
        None => info!("idle shutdown disabled"),
    }

    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

#[cfg(feature = "couch-store")]
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    use valheimctl::dao::kv_store::couchdb::CouchKvStore;

    match config.couch.clone() {
        Some(couch) => {
            let store = CouchKvStore::connect(couch)
                .await
                .context("connecting to CouchDB")?;
            info!("using CouchDB key-value store");
            Ok(Arc::new(store))
        }
        None => Ok(memory_store()),
    }
}

#[cfg(not(feature = "couch-store"))]
async fn connect_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    Ok(memory_store())
}

fn memory_store() -> Arc<dyn KvStore> {
    warn!("no persistent store configured; logs and observations are lost on restart");
    Arc::new(MemoryKvStore::new())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
