//! Test doubles shared by the service tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use futures::future::BoxFuture;

use crate::dao::{
    kubernetes::{
        GameServerApi, KubeResult, KubernetesError, PodStatus, ReplicaCounts, ServerStatus,
    },
    kv_store::{KvListing, KvStore, KvValue, MemoryKvStore, PutOptions},
    observation::OBSERVATION_KEY,
    storage::StorageResult,
};

/// Game server double answering with a fixed status and recording scale calls.
#[derive(Default)]
pub struct FakeServer {
    status: Mutex<Option<ServerStatus>>,
    scales: Mutex<Vec<u32>>,
    fail_scale: bool,
}

impl FakeServer {
    pub fn online(players: u32) -> Self {
        let server = Self::default();
        server.set_players(Some(players));
        server
    }

    /// Online server whose scale calls are rejected with 403.
    pub fn failing_scale(players: u32) -> Self {
        Self {
            fail_scale: true,
            ..Self::online(players)
        }
    }

    pub fn set_players(&self, players: Option<u32>) {
        *self.status.lock().unwrap() = Some(match players {
            Some(players) => ServerStatus::Online {
                version: "0.217".into(),
                players,
            },
            None => ServerStatus::Offline,
        });
    }

    pub fn scales(&self) -> Vec<u32> {
        self.scales.lock().unwrap().clone()
    }
}

impl GameServerApi for FakeServer {
    fn server_status(&self) -> BoxFuture<'static, KubeResult<ServerStatus>> {
        let status = self.status.lock().unwrap().clone().unwrap_or(ServerStatus::Offline);
        Box::pin(async move { Ok(status) })
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
        let fail = self.fail_scale;
        Box::pin(async move {
            if fail {
                Err(KubernetesError::UnexpectedStatus {
                    url: "https://gateway/scale".into(),
                    status: reqwest::StatusCode::FORBIDDEN,
                    body: "forbidden".into(),
                })
            } else {
                Ok(())
            }
        })
    }
}

/// Store wrapper counting writes to the observation key.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryKvStore,
    pub observation_puts: AtomicUsize,
}

impl KvStore for CountingStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.inner.get(key)
    }

    fn get_with_metadata(
        &self,
        key: String,
    ) -> BoxFuture<'static, StorageResult<Option<KvValue>>> {
        self.inner.get_with_metadata(key)
    }

    fn put(
        &self,
        key: String,
        value: String,
        options: PutOptions,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if key == OBSERVATION_KEY {
            self.observation_puts.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.put(key, value, options)
    }

    fn list(
        &self,
        prefix: String,
        cursor: Option<String>,
    ) -> BoxFuture<'static, StorageResult<KvListing>> {
        self.inner.list(prefix, cursor)
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete(key)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
}
