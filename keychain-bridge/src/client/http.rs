//! HTTP/JSON transport to the decision service.
//!
//! | Path | Response body |
//! |---|---|
//! | `POST /request_key` | `{ "ok": bool, "key": base64, "reason": string }` |
//! | `POST /request_signature` | `{ "ok": bool, "signature": base64, "reason": string }` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::*;
use crate::encoding::base64_bytes;
use crate::error::TransportError;
use crate::request::{KeyRequest, SignRequest};

pub const REQUEST_KEY_PATH: &str = "request_key";
pub const REQUEST_SIGNATURE_PATH: &str = "request_signature";

/// Decision service reached over HTTP.
pub struct HttpDecisionClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpDecisionClient {
    /// Create a client from connection settings.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            timeout: config.timeout,
        })
    }

    /// Configured per-exchange timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the URL for an endpoint path, appended to the base URL's path.
    /// Any query on the base URL is kept.
    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        // http and https URLs always have path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(path.trim_start_matches('/'));
        }
        url
    }

    /// Map a reqwest failure during send or body read.
    fn transfer_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout: self.timeout,
            }
        } else {
            TransportError::Network(err)
        }
    }

    /// POST `request` as JSON and decode a 200 response into `Res`.
    async fn post_json<Req, Res>(&self, path: &str, request: &Req) -> Result<Res, TransportError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(TransportError::Encoding)?;

        let response = self
            .client
            .post(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.transfer_error(e))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::UnexpectedStatus { status, body });
        }

        let body = response.bytes().await.map_err(|e| self.transfer_error(e))?;
        serde_json::from_slice(&body).map_err(TransportError::Decoding)
    }
}

/// `/request_key` response body.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct KeyDecisionBody {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, with = "base64_bytes")]
    pub key: Vec<u8>,
    #[serde(default)]
    pub reason: String,
}

impl From<KeyDecisionBody> for DecisionResponse {
    fn from(body: KeyDecisionBody) -> Self {
        Self {
            ok: body.ok,
            payload: body.key,
            reject_reason: body.reason,
        }
    }
}

/// `/request_signature` response body.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SignatureDecisionBody {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(default)]
    pub reason: String,
}

impl From<SignatureDecisionBody> for DecisionResponse {
    fn from(body: SignatureDecisionBody) -> Self {
        Self {
            ok: body.ok,
            payload: body.signature,
            reject_reason: body.reason,
        }
    }
}

#[async_trait]
impl DecisionClient for HttpDecisionClient {
    async fn request_key(&self, request: &KeyRequest) -> Result<DecisionResponse, TransportError> {
        let body: KeyDecisionBody = self.post_json(REQUEST_KEY_PATH, request).await?;
        Ok(body.into())
    }

    async fn request_signature(
        &self,
        request: &SignRequest,
    ) -> Result<DecisionResponse, TransportError> {
        let body: SignatureDecisionBody = self.post_json(REQUEST_SIGNATURE_PATH, request).await?;
        Ok(body.into())
    }
}
