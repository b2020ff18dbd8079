//! In-process key-value store used when no external backend is configured and in tests.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::time::Instant;

use crate::dao::storage::StorageResult;

use super::{KvListing, KvStore, KvValue, ListedKey, PutOptions};

/// Page size used by hosted KV stores for a single listing call.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    metadata: Option<Value>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// `DashMap` backed store with lazy TTL expiry and paginated prefix listings.
#[derive(Clone)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
    list_limit: usize,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    /// Empty store with the default page size.
    pub fn new() -> Self {
        Self::with_list_limit(DEFAULT_LIST_LIMIT)
    }

    /// Build a store whose listings return at most `list_limit` keys per call.
    pub fn with_list_limit(list_limit: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            list_limit: list_limit.max(1),
        }
    }

    fn lookup(&self, key: &str) -> Option<MemoryEntry> {
        let now = Instant::now();
        let entry = self.entries.get(key)?.clone();
        if entry.is_expired(now) {
            self.entries.remove(key);
            return None;
        }
        Some(entry)
    }

    fn list_sync(&self, prefix: &str, cursor: Option<&str>) -> KvListing {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let mut matching: Vec<ListedKey> = self
            .entries
            .iter()
            .filter(|item| item.key().starts_with(prefix))
            .filter(|item| cursor.is_none_or(|after| item.key().as_str() > after))
            .map(|item| ListedKey {
                name: item.key().clone(),
                metadata: item.value().metadata.clone(),
            })
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        if matching.len() <= self.list_limit {
            return KvListing {
                keys: matching,
                list_complete: true,
                cursor: None,
            };
        }

        matching.truncate(self.list_limit);
        let cursor = matching.last().map(|key| key.name.clone());
        KvListing {
            keys: matching,
            list_complete: false,
            cursor,
        }
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let found = self.lookup(&key).map(|entry| entry.value);
        Box::pin(async move { Ok(found) })
    }

    fn get_with_metadata(&self, key: String) -> BoxFuture<'static, StorageResult<Option<KvValue>>> {
        let found = self.lookup(&key).map(|entry| KvValue {
            value: entry.value,
            metadata: entry.metadata,
        });
        Box::pin(async move { Ok(found) })
    }

    fn put(
        &self,
        key: String,
        value: String,
        options: PutOptions,
    ) -> BoxFuture<'static, StorageResult<()>> {
        // A deadline past what `Instant` can represent never expires.
        let expires_at = options
            .expiration_ttl
            .and_then(|ttl| Instant::now().checked_add(Duration::from_secs(ttl.as_secs())));
        self.entries.insert(
            key,
            MemoryEntry {
                value,
                metadata: options.metadata,
                expires_at,
            },
        );
        Box::pin(async { Ok(()) })
    }

    fn list(
        &self,
        prefix: String,
        cursor: Option<String>,
    ) -> BoxFuture<'static, StorageResult<KvListing>> {
        let listing = self.list_sync(&prefix, cursor.as_deref());
        Box::pin(async move { Ok(listing) })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>> {
        self.entries.remove(&key);
        Box::pin(async { Ok(()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::models::TtlSeconds;

    async fn put_plain(store: &MemoryKvStore, key: &str) {
        store
            .put(key.into(), format!("value of {key}"), PutOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_returns_written_value_and_metadata() {
        let store = MemoryKvStore::new();
        store
            .put(
                "log/a".into(),
                "hello".into(),
                PutOptions {
                    expiration_ttl: None,
                    metadata: Some(json!({"instant": 42})),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.get("log/a".into()).await.unwrap().as_deref(), Some("hello"));
        let with_meta = store.get_with_metadata("log/a".into()).await.unwrap().unwrap();
        assert_eq!(with_meta.metadata, Some(json!({"instant": 42})));
        assert!(store.get("log/missing".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_prefix_in_lexicographic_order() {
        let store = MemoryKvStore::new();
        for key in ["b/2", "a/1", "b/1", "c"] {
            put_plain(&store, key).await;
        }

        let listing = store.list("b/".into(), None).await.unwrap();
        let names: Vec<_> = listing.keys.iter().map(|key| key.name.as_str()).collect();
        assert_eq!(names, ["b/1", "b/2"]);
        assert!(listing.list_complete);
        assert!(listing.cursor.is_none());
    }

    #[tokio::test]
    async fn list_paginates_past_the_limit() {
        let store = MemoryKvStore::with_list_limit(2);
        for key in ["p/1", "p/2", "p/3"] {
            put_plain(&store, key).await;
        }

        let first = store.list("p/".into(), None).await.unwrap();
        assert!(!first.list_complete);
        assert_eq!(first.keys.len(), 2);
        assert_eq!(first.cursor.as_deref(), Some("p/2"));

        let second = store.list("p/".into(), first.cursor).await.unwrap();
        assert!(second.list_complete);
        assert_eq!(second.keys.len(), 1);
        assert_eq!(second.keys[0].name, "p/3");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_disappear() {
        let store = MemoryKvStore::new();
        store
            .put(
                "ttl/a".into(),
                "short lived".into(),
                PutOptions {
                    expiration_ttl: Some(TtlSeconds(60)),
                    metadata: None,
                },
            )
            .await
            .unwrap();
        put_plain(&store, "ttl/b").await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("ttl/a".into()).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("ttl/a".into()).await.unwrap().is_none());
        let listing = store.list("ttl/".into(), None).await.unwrap();
        assert_eq!(listing.keys.len(), 1);
        assert_eq!(listing.keys[0].name, "ttl/b");
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let store = MemoryKvStore::new();
        store
            .put(
                "ttl/forever".into(),
                "kept".into(),
                PutOptions {
                    expiration_ttl: Some(TtlSeconds(u64::MAX)),
                    metadata: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.get("ttl/forever".into()).await.unwrap().as_deref(),
            Some("kept")
        );
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = MemoryKvStore::new();
        put_plain(&store, "gone").await;
        store.delete("gone".into()).await.unwrap();
        assert!(store.get("gone".into()).await.unwrap().is_none());
    }
}
