//! Mock decision client for testing.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::http::{KeyDecisionBody, SignatureDecisionBody};
use super::traits::*;
use crate::error::TransportError;
use crate::request::{KeyRequest, SignRequest};

/// Scripted answer for one exchange.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with `ok: true` and this payload
    Approve(Vec<u8>),
    /// 200 with `ok: false` and this reason
    Reject(String),
    /// Non-200 status with a raw body
    Status(StatusCode, String),
    /// 200 with this raw body, decoded like a real response
    RawBody(String),
    /// The exchange runs past the deadline
    Timeout(Duration),
}

type Responder = Arc<dyn Fn(u64) -> MockReply + Send + Sync>;

/// Mock client for testing.
///
/// Answers are chosen per request id by a responder closure, one per
/// endpoint. An optional delay simulates network latency.
pub struct MockDecisionClient {
    key_responder: Responder,
    signature_responder: Responder,
    delay: Option<Duration>,
    key_calls: AtomicU32,
    signature_calls: AtomicU32,
}

impl MockDecisionClient {
    /// Create a mock that approves everything with an empty payload.
    pub fn new() -> Self {
        Self {
            key_responder: Arc::new(|_| MockReply::Approve(Vec::new())),
            signature_responder: Arc::new(|_| MockReply::Approve(Vec::new())),
            delay: None,
            key_calls: AtomicU32::new(0),
            signature_calls: AtomicU32::new(0),
        }
    }

    /// Answer every key request with `reply`.
    pub fn with_key_reply(self, reply: MockReply) -> Self {
        self.with_key_responder(move |_| reply.clone())
    }

    /// Answer every signature request with `reply`.
    pub fn with_signature_reply(self, reply: MockReply) -> Self {
        self.with_signature_responder(move |_| reply.clone())
    }

    /// Choose the key answer from the request id.
    pub fn with_key_responder(
        mut self,
        responder: impl Fn(u64) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        self.key_responder = Arc::new(responder);
        self
    }

    /// Choose the signature answer from the request id.
    pub fn with_signature_responder(
        mut self,
        responder: impl Fn(u64) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        self.signature_responder = Arc::new(responder);
        self
    }

    /// Wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of key exchanges so far.
    pub fn key_calls(&self) -> u32 {
        self.key_calls.load(Ordering::SeqCst)
    }

    /// Number of signature exchanges so far.
    pub fn signature_calls(&self) -> u32 {
        self.signature_calls.load(Ordering::SeqCst)
    }

    async fn play<B>(&self, reply: MockReply) -> Result<DecisionResponse, TransportError>
    where
        B: serde::de::DeserializeOwned + Into<DecisionResponse>,
    {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Approve(payload) => Ok(DecisionResponse::approved(payload)),
            MockReply::Reject(reason) => Ok(DecisionResponse::rejected(reason)),
            MockReply::Status(status, body) => Err(TransportError::UnexpectedStatus { status, body }),
            MockReply::RawBody(body) => serde_json::from_str::<B>(&body)
                .map(Into::into)
                .map_err(TransportError::Decoding),
            MockReply::Timeout(timeout) => Err(TransportError::Timeout { timeout }),
        }
    }
}

impl Default for MockDecisionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionClient for MockDecisionClient {
    async fn request_key(&self, request: &KeyRequest) -> Result<DecisionResponse, TransportError> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.key_responder)(request.id);
        self.play::<KeyDecisionBody>(reply).await
    }

    async fn request_signature(
        &self,
        request: &SignRequest,
    ) -> Result<DecisionResponse, TransportError> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.signature_responder)(request.id);
        self.play::<SignatureDecisionBody>(reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_counts_calls() {
        let client = MockDecisionClient::new().with_key_reply(MockReply::Approve(b"k".to_vec()));

        assert_eq!(client.key_calls(), 0);

        let response = client.request_key(&KeyRequest::new(1)).await.unwrap();

        assert_eq!(response, DecisionResponse::approved(b"k".to_vec()));
        assert_eq!(client.key_calls(), 1);
        assert_eq!(client.signature_calls(), 0);
    }

    #[tokio::test]
    async fn test_raw_body_uses_endpoint_schema() {
        let client = MockDecisionClient::new()
            .with_signature_reply(MockReply::RawBody(r#"{"ok":true,"signature":"YWJjZA=="}"#.into()));

        let response = client
            .request_signature(&SignRequest::new(1, 1, Vec::new()))
            .await
            .unwrap();
        assert_eq!(response.payload, b"abcd");

        let client = MockDecisionClient::new().with_key_reply(MockReply::RawBody("nope".into()));
        let err = client.request_key(&KeyRequest::new(2)).await.unwrap_err();
        assert_eq!(err.cause(), "decoding");
    }

    #[tokio::test]
    async fn test_responder_sees_request_id() {
        let client =
            MockDecisionClient::new().with_key_responder(|id| MockReply::Approve(id.to_be_bytes().to_vec()));

        let response = client.request_key(&KeyRequest::new(77)).await.unwrap();
        assert_eq!(response.payload, 77u64.to_be_bytes().to_vec());
    }
}
