//! Error types for the bridge.

use std::time::Duration;

use reqwest::StatusCode;

/// Failure of a single exchange with the decision service.
///
/// Every variant is terminal for the request that produced it. The full
/// message is meant for logs only; callers of the custody application see a
/// generic reason instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be serialized
    #[error("encoding JSON payload: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Connection or transfer failure
    #[error("sending HTTP request: {0}")]
    Network(#[source] reqwest::Error),

    /// The configured timeout expired before the exchange completed
    #[error("exchange timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Decision service answered with something other than 200 OK
    #[error("unexpected status code: {status}\nbody:\n{body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// Response body was not a valid decision
    #[error("decoding HTTP response body: {0}")]
    Decoding(#[source] serde_json::Error),
}

impl TransportError {
    /// Short machine-readable cause, used as a structured log field.
    pub fn cause(&self) -> &'static str {
        match self {
            TransportError::Encoding(_) => "encoding",
            TransportError::Network(_) => "network",
            TransportError::Timeout { .. } => "timeout",
            TransportError::UnexpectedStatus { .. } => "unexpected_status",
            TransportError::Decoding(_) => "decoding",
        }
    }

    /// Whether the failure was an expired timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// The custody application could not take a resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Nobody is waiting for the resolution any more
    #[error("resolution could not be delivered: {0}")]
    Undeliverable(String),

    /// The custody application refused the resolution
    #[error("custody application refused resolution: {0}")]
    Custody(String),
}
