use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Timestamped message stored in an append-only KV log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub instant: i64,
    /// Free-form text, stored as the KV value.
    pub message: String,
}

impl LogEntry {
    /// Build an entry stamped with `instant`.
    pub fn new(instant: i64, message: impl Into<String>) -> Self {
        Self {
            instant,
            message: message.into(),
        }
    }
}

/// Key found under a log prefix together with the instant recovered from its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedKey {
    /// Full key, prefix included.
    pub key: String,
    /// Milliseconds since the Unix epoch.
    pub instant: i64,
}

/// Last known player count of the game server.
///
/// `num_players` is `None` when the status endpoint reported the server offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// When the count was first seen, in milliseconds since the Unix epoch.
    pub instant: i64,
    /// Player count, `None` while offline.
    pub num_players: Option<u32>,
}

/// Expiration applied to KV writes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TtlSeconds(pub u64);

impl TtlSeconds {
    /// TTL in seconds.
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// TTL in milliseconds, saturating at `i64::MAX`.
    pub fn as_millis(self) -> i64 {
        i64::try_from(self.0.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
