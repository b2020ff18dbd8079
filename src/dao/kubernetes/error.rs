//! Error types for calls made through the Kubernetes API gateway.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`KubernetesError`] failures.
pub type KubeResult<T> = Result<T, KubernetesError>;

/// Failures that can occur while talking to the Kubernetes API gateway.
#[derive(Debug, Error)]
pub enum KubernetesError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Kubernetes client")]
    ClientBuilder {
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or its body could not be read.
    #[error("failed to send request to `{url}`")]
    RequestSend {
        /// Requested URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// The gateway answered with a status the caller does not handle.
    #[error("{url} => {status}\n\n{body}")]
    UnexpectedStatus {
        /// Requested URL.
        url: String,
        /// Status the gateway answered with.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },
    /// The response body was not the JSON document the caller expected.
    #[error("unexpected response body from `{url}`: {body}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Raw response body.
        body: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// The pod reported a container state none of the known shapes match.
    #[error("unrecognized container state from `{url}`: {body}")]
    UnrecognizedPod {
        /// Requested URL.
        url: String,
        /// Raw response body.
        body: String,
    },
}
