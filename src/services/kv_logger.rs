use std::{cmp::Reverse, sync::Arc};

use futures::future::try_join_all;

use crate::dao::{
    kv_log::KvLogPersistence,
    kv_store::KvStore,
    models::{LogEntry, ScannedKey, TtlSeconds, now_millis},
    storage::{StorageError, StorageResult},
};

/// Append-only log of text messages, read back in time order.
#[derive(Clone)]
pub struct KvLogger {
    persistence: KvLogPersistence,
}

impl KvLogger {
    /// Log stored under `prefix` whose entries expire after `ttl`.
    pub fn new(kv: Arc<dyn KvStore>, prefix: impl Into<String>, ttl: TtlSeconds) -> Self {
        Self::from_persistence(KvLogPersistence::new(kv, prefix, ttl))
    }

    /// Wrap an existing persistence handle.
    pub fn from_persistence(persistence: KvLogPersistence) -> Self {
        Self { persistence }
    }

    /// Append `entry` as given.
    pub async fn push(&self, entry: LogEntry) -> StorageResult<LogEntry> {
        self.persistence.push(entry).await
    }

    /// Append `message` stamped with the current time.
    pub async fn log(&self, message: impl Into<String>) -> StorageResult<LogEntry> {
        self.push(LogEntry::new(now_millis(), message)).await
    }

    /// Every live entry, earliest first.
    pub async fn oldest(&self) -> StorageResult<Vec<LogEntry>> {
        self.entries(|keys| keys.sort_by_key(|key| key.instant)).await
    }

    /// Every live entry, latest first.
    pub async fn newest(&self) -> StorageResult<Vec<LogEntry>> {
        self.entries(|keys| keys.sort_by_key(|key| Reverse(key.instant)))
            .await
    }

    async fn entries<F>(&self, order: F) -> StorageResult<Vec<LogEntry>>
    where
        F: FnOnce(&mut Vec<ScannedKey>),
    {
        // Ordering is only meaningful over the full key set.
        let mut keys = self.persistence.scan_keys(false).await?;
        order(&mut keys);

        try_join_all(keys.into_iter().map(|ScannedKey { key, instant }| async move {
            let message = self.persistence.get_message(&key).await?;
            Ok::<_, StorageError>(LogEntry { instant, message })
        }))
        .await
    }
}
