//! Library crate for valheimctl: start/stop controls, append-only KV logs, and idle
//! shutdown for a Valheim server running as a Kubernetes StatefulSet.

/// Process configuration read from the environment.
pub mod config;
/// Storage and cluster access.
pub mod dao;
mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Operations behind the routes and the scheduler.
pub mod services;
/// Shared application state.
pub mod state;
#[cfg(test)]
mod test_support;
