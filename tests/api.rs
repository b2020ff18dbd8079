//! End-to-end checks of the HTTP surface against the in-memory store and a stub cluster.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use futures::future::BoxFuture;
use serde_json::Value;
use tower::ServiceExt;
use valheimctl::{
    config::IdleTimeout,
    dao::{
        kubernetes::{GameServerApi, KubeResult, PodStatus, ReplicaCounts, ServerStatus},
        kv_store::MemoryKvStore,
        models::TtlSeconds,
    },
    routes,
    state::{AppState, ControlOptions},
};

#[derive(Default)]
struct StubServer {
    scales: Mutex<Vec<u32>>,
}

impl GameServerApi for StubServer {
    fn server_status(&self) -> BoxFuture<'static, KubeResult<ServerStatus>> {
        Box::pin(async {
            Ok(ServerStatus::Online {
                version: "0.217.46".into(),
                players: 3,
            })
        })
    }

    fn pod_status(&self) -> BoxFuture<'static, KubeResult<PodStatus>> {
        Box::pin(async { Ok(PodStatus::Running) })
    }

    fn replica_counts(&self) -> BoxFuture<'static, KubeResult<ReplicaCounts>> {
        Box::pin(async {
            Ok(ReplicaCounts {
                desired: 1,
                running: 1,
            })
        })
    }

    fn scale(&self, replicas: u32) -> BoxFuture<'static, KubeResult<()>> {
        self.scales.lock().unwrap().push(replicas);
        Box::pin(async { Ok(()) })
    }
}

fn app(server: Arc<StubServer>, options: ControlOptions) -> Router {
    routes::router(AppState::new(Arc::new(MemoryKvStore::new()), server, options))
}

fn all_features() -> ControlOptions {
    ControlOptions {
        actor_log_ttl: Some(TtlSeconds(3600)),
        idle_shutdown_after: Some(IdleTimeout::from_secs(600)),
        idle_shutdown_log_ttl: Some(TtlSeconds(3600)),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let app = app(Arc::default(), ControlOptions::default());
    let (status, body) = send(&app, get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn start_redirects_and_records_the_actor() {
    let server = Arc::new(StubServer::default());
    let app = app(server.clone(), all_features());

    let request = Request::post("/start")
        .header("cf-connecting-ip", "198.51.100.23")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    assert_eq!(*server.scales.lock().unwrap(), [1]);

    let (status, body) = send(&app, get("/logs/actor")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["message"], "198.51.100.23 started the server");
}

#[tokio::test]
async fn status_includes_server_and_logs() {
    let server = Arc::new(StubServer::default());
    let app = app(server, all_features());

    let stop = Request::post("/stop").body(Body::empty()).unwrap();
    app.clone().oneshot(stop).await.unwrap();

    let (status, body) = send(&app, get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pod"]["kind"], "running");
    assert_eq!(body["server"]["players"], 3);
    assert_eq!(body["idle_shutdown_after_secs"], 600);
    assert_eq!(body["actor_log"][0]["message"], "Unknown IP stopped the server");
}

#[tokio::test]
async fn idle_check_stores_the_first_observation() {
    let server = Arc::new(StubServer::default());
    let app = app(server.clone(), all_features());

    let request = Request::post("/idle-check").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["shutdown"], false);
    assert_eq!(body["observation"]["numPlayers"], 3);
    assert!(server.scales.lock().unwrap().is_empty());

    let (_, log) = send(&app, get("/logs/idle-shutdown?order=oldest")).await;
    assert_eq!(log[0]["message"], "Observed 3 players");
}

#[tokio::test]
async fn idle_check_is_not_found_when_disabled() {
    let app = app(Arc::default(), ControlOptions::default());
    let request = Request::post("/idle-check").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn out_of_range_limit_is_rejected() {
    let app = app(Arc::default(), all_features());
    let response = app.oneshot(get("/logs/actor?limit=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disabled_log_is_not_found() {
    let app = app(Arc::default(), ControlOptions::default());
    let response = app.oneshot(get("/logs/actor")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
