use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The store paginated a prefix listing, so ordering over the prefix cannot be trusted.
    #[error("more than {returned} keys present under `{prefix}`, cursor: {cursor:?}")]
    IncompleteListing {
        /// Listed prefix.
        prefix: String,
        /// Number of keys in the truncated page.
        returned: usize,
        /// Resume point reported by the store.
        cursor: Option<String>,
    },
    /// A listed key carries metadata that does not describe a log entry.
    #[error("{key} has {reason}")]
    MalformedMetadata {
        /// Offending key.
        key: String,
        /// What is wrong with the metadata.
        reason: &'static str,
    },
    /// A key returned by a listing has no value anymore.
    #[error("{key} has a null message")]
    MissingValue {
        /// Listed key without a value.
        key: String,
    },
    /// A stored value could not be decoded into the expected model.
    #[error("failed to decode stored value for `{key}`")]
    Corrupt {
        /// Key holding the undecodable value.
        key: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
