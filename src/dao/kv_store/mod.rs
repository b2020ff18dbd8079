/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::{models::TtlSeconds, storage::StorageResult};

pub use memory::MemoryKvStore;

/// Options attached to a single `put`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    /// Delete the key automatically once this many seconds have elapsed.
    pub expiration_ttl: Option<TtlSeconds>,
    /// Arbitrary JSON carried alongside the key and returned by `list`.
    pub metadata: Option<Value>,
}

/// Value read back together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct KvValue {
    /// Stored value.
    pub value: String,
    /// Metadata attached at write time.
    pub metadata: Option<Value>,
}

/// One key returned by a prefix listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedKey {
    /// Full key.
    pub name: String,
    /// Metadata attached at write time.
    pub metadata: Option<Value>,
}

/// Result of a prefix listing.
///
/// When `list_complete` is false, more keys exist after `cursor`.
#[derive(Debug, Clone, PartialEq)]
pub struct KvListing {
    /// Keys in lexicographic order.
    pub keys: Vec<ListedKey>,
    /// False when more keys exist after `cursor`.
    pub list_complete: bool,
    /// Resume point for the next call.
    pub cursor: Option<String>,
}

/// Eventually consistent key-value store with per-key metadata and expiration.
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, `None` when absent or expired.
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Value and metadata stored under `key`.
    fn get_with_metadata(&self, key: String) -> BoxFuture<'static, StorageResult<Option<KvValue>>>;
    /// Create or overwrite `key`.
    fn put(
        &self,
        key: String,
        value: String,
        options: PutOptions,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List keys starting with `prefix`, resuming after `cursor` when given.
    fn list(
        &self,
        prefix: String,
        cursor: Option<String>,
    ) -> BoxFuture<'static, StorageResult<KvListing>>;
    /// Remove `key`; absent keys are not an error.
    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
