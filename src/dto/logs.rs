use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::dao::models::LogEntry;

use super::format_millis;

/// Read direction for a log listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogOrder {
    /// Earliest entry first.
    Oldest,
    /// Latest entry first.
    #[default]
    Newest,
}

/// Query string accepted by the log listing routes.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Read direction, newest first when omitted.
    pub order: Option<LogOrder>,
    /// Maximum number of entries to return.
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn newest_first(&self) -> bool {
        self.order.unwrap_or_default() == LogOrder::Newest
    }
}

/// One log line as returned over HTTP.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LogEntryDto {
    /// Milliseconds since the Unix epoch.
    pub instant: i64,
    /// RFC 3339 rendering of `instant`.
    pub timestamp: String,
    pub message: String,
}

impl From<LogEntry> for LogEntryDto {
    fn from(entry: LogEntry) -> Self {
        Self {
            timestamp: format_millis(entry.instant),
            instant: entry.instant,
            message: entry.message,
        }
    }
}
