//! Error types for the engine crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the control plane or to nodes.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, TLS, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the control-plane API.
    #[error("API error ({status}) at {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// Response decoded but did not have the expected shape.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// The engine was constructed with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A topic or key was absent from a fetched resource.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// An internal address has no entry in the cluster's node table.
    #[error("unknown cluster node address: {0}")]
    UnknownNodeAddress(String),

    /// A statistics window held no usable samples for the requested field.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A remote command ran but did not succeed.
    #[error("remote command failed on {target}: {detail}")]
    RemoteCommandFailed { target: String, detail: String },

    /// A remote command exceeded its per-command time budget.
    #[error("remote command timed out on {target} after {timeout:?}")]
    RemoteTimeout { target: String, timeout: Duration },

    /// The dispatched task itself could not be joined.
    #[error("remote dispatch failed: {0}")]
    RemoteDispatch(String),

    /// Local I/O error while spawning or reading a command.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True when the error indicates the peer could not be reached at all,
    /// as opposed to an unhealthy-but-responding peer.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::RemoteTimeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classifies_as_connection_error() {
        let err = ClientError::RemoteTimeout {
            target: "10.0.0.1".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_connection_error());
    }

    #[test]
    fn api_error_is_not_a_connection_error() {
        let err = ClientError::Api {
            status: 500,
            url: "https://cluster.local:9443/v1/nodes".to_string(),
            message: "boom".to_string(),
        };
        assert!(!err.is_connection_error());
    }
}
