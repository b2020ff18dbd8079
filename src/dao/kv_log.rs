//! Storage side of the append-only log: one TTL-bound key per entry, ordered through metadata.
//!
//! The backing store has no ordered scan, so every key carries `{"instant": <ms>}` as metadata
//! and readers recover the order by listing the whole prefix and sorting on that field.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::{
    kv_store::{KvStore, PutOptions},
    models::{LogEntry, ScannedKey, TtlSeconds},
    storage::{StorageError, StorageResult},
};

const INSTANT_FIELD: &str = "instant";

/// Writes and scans log entries stored under a single key prefix.
#[derive(Clone)]
pub struct KvLogPersistence {
    kv: Arc<dyn KvStore>,
    prefix: String,
    ttl: TtlSeconds,
}

impl KvLogPersistence {
    /// Log under `prefix` whose entries expire after `ttl`.
    pub fn new(kv: Arc<dyn KvStore>, prefix: impl Into<String>, ttl: TtlSeconds) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
            ttl,
        }
    }

    /// Store `entry` under a fresh random key and hand it back unchanged.
    pub async fn push(&self, entry: LogEntry) -> StorageResult<LogEntry> {
        let key = format!("{}{}", self.prefix, Uuid::new_v4().simple());
        self.kv
            .put(
                key,
                entry.message.clone(),
                PutOptions {
                    expiration_ttl: Some(self.ttl),
                    metadata: Some(json!({ "instant": entry.instant })),
                },
            )
            .await?;
        Ok(entry)
    }

    /// Message stored under `key`; a listed key without a value is an error.
    pub async fn get_message(&self, key: &str) -> StorageResult<String> {
        self.kv
            .get(key.to_string())
            .await?
            .ok_or_else(|| StorageError::MissingValue {
                key: key.to_string(),
            })
    }

    /// List every key under the prefix with its instant.
    ///
    /// A paginated listing is an error unless `allow_incomplete` is set.
    pub async fn scan_keys(&self, allow_incomplete: bool) -> StorageResult<Vec<ScannedKey>> {
        let listing = self.kv.list(self.prefix.clone(), None).await?;

        if !allow_incomplete && !listing.list_complete {
            return Err(StorageError::IncompleteListing {
                prefix: self.prefix.clone(),
                returned: listing.keys.len(),
                cursor: listing.cursor,
            });
        }

        listing
            .keys
            .into_iter()
            .map(|listed| {
                let instant = instant_from_metadata(&listed.name, listed.metadata.as_ref())?;
                Ok(ScannedKey {
                    key: listed.name,
                    instant,
                })
            })
            .collect()
    }
}

fn instant_from_metadata(key: &str, metadata: Option<&Value>) -> StorageResult<i64> {
    let Some(Value::Object(fields)) = metadata else {
        return Err(StorageError::MalformedMetadata {
            key: key.to_string(),
            reason: "non-object metadata",
        });
    };

    fields
        .get(INSTANT_FIELD)
        .and_then(Value::as_i64)
        .ok_or_else(|| StorageError::MalformedMetadata {
            key: key.to_string(),
            reason: "non-number instant",
        })
}
