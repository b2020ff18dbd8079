/// Kubernetes API gateway client for the game server workload.
pub mod kubernetes;
/// Append-only, TTL-bound log stored in the key-value store.
pub mod kv_log;
/// Key-value store abstraction and its backends.
pub mod kv_store;
/// Persisted model definitions.
pub mod models;
/// Last player-count observation.
pub mod observation;
/// Storage error types shared by every backend.
pub mod storage;
