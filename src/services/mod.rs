/// Start/stop and status operations for operators.
pub mod control_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Time-ordered logger over the key-value store.
pub mod kv_logger;
/// Periodic idle checks.
pub mod scheduler;
/// Idle detection and scale-to-zero.
pub mod shutdown_service;
