//! Core trait for decision-service transports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::TransportError;
use crate::request::{KeyRequest, SignRequest};

/// One request/response exchange with the decision service per call.
///
/// Implementations hold configuration only. Calls are independent of each
/// other and may run concurrently.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Ask whether key material may be issued for `request`.
    async fn request_key(&self, request: &KeyRequest) -> Result<DecisionResponse, TransportError>;

    /// Ask whether `request` may be signed.
    async fn request_signature(
        &self,
        request: &SignRequest,
    ) -> Result<DecisionResponse, TransportError>;
}

/// A decision, independent of which endpoint produced it.
///
/// When `ok` is true only `payload` is meaningful, otherwise only
/// `reject_reason` is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionResponse {
    pub ok: bool,
    /// Key or signature bytes
    pub payload: Vec<u8>,
    pub reject_reason: String,
}

impl DecisionResponse {
    /// An approval carrying `payload`.
    pub fn approved(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            ok: true,
            payload: payload.into(),
            reject_reason: String::new(),
        }
    }

    /// A rejection with a human-readable reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: Vec::new(),
            reject_reason: reason.into(),
        }
    }
}

/// Connection settings for a transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint; request paths are joined onto it
    pub base_url: Url,
    /// Deadline for a whole exchange, body included
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self { base_url, timeout }
    }
}
