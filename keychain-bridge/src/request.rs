//! Requests originated by the custody application.
//!
//! The dispatcher never looks inside a request beyond its `id`. The typed
//! fields exist so the JSON sent to the decision service has a fixed,
//! documented shape.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{DecisionClient, DecisionResponse};
use crate::encoding::base64_bytes;
use crate::error::TransportError;

/// Which kind of request is being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Request for new key material
    Key,
    /// Request for a signature with an existing key
    Signature,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Key => "key",
            RequestKind::Signature => "signature",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key scheme requested. Integer-encoded on the wire.
///
/// Values this crate does not know are kept in `Other` and sent back out
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum KeyType {
    #[default]
    Unspecified,
    EcdsaSecp256k1,
    EddsaEd25519,
    Other(i32),
}

impl From<i32> for KeyType {
    fn from(value: i32) -> Self {
        match value {
            0 => KeyType::Unspecified,
            1 => KeyType::EcdsaSecp256k1,
            2 => KeyType::EddsaEd25519,
            other => KeyType::Other(other),
        }
    }
}

impl From<KeyType> for i32 {
    fn from(value: KeyType) -> Self {
        match value {
            KeyType::Unspecified => 0,
            KeyType::EcdsaSecp256k1 => 1,
            KeyType::EddsaEd25519 => 2,
            KeyType::Other(other) => other,
        }
    }
}

/// Fee amount in a single denomination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Decimal integer as text, to avoid precision loss
    pub amount: String,
}

/// Request for a new key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRequest {
    /// Correlation identifier
    pub id: u64,
    /// Address that created the request
    pub creator: String,
    pub space_id: u64,
    pub keychain_id: u64,
    pub key_type: KeyType,
    pub deducted_keychain_fees: Vec<Coin>,
}

impl KeyRequest {
    /// Create a request with the given id and zero values elsewhere.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Set the key type.
    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }
}

/// Request for a signature over `data_for_signing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignRequest {
    /// Correlation identifier
    pub id: u64,
    /// Address that created the request
    pub creator: String,
    pub key_id: u64,
    pub key_type: KeyType,
    #[serde(with = "base64_bytes")]
    pub data_for_signing: Vec<u8>,
    /// Public key the result should be encrypted to, empty when unused
    #[serde(with = "base64_bytes")]
    pub encryption_key: Vec<u8>,
    pub deducted_keychain_fees: Vec<Coin>,
}

impl SignRequest {
    /// Create a request to sign `data` with key `key_id`.
    pub fn new(id: u64, key_id: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            key_id,
            data_for_signing: data.into(),
            ..Default::default()
        }
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }
}

/// A request the dispatcher can forward.
///
/// Selects which decision-service operation handles the request, so the
/// dispatcher runs one algorithm for every request kind.
#[async_trait]
pub trait Forwardable: Send + Sync + 'static {
    const KIND: RequestKind;

    /// Correlation identifier.
    fn id(&self) -> u64;

    /// Run the exchange for this request kind.
    async fn exchange(
        &self,
        client: &dyn DecisionClient,
    ) -> Result<DecisionResponse, TransportError>;
}

#[async_trait]
impl Forwardable for KeyRequest {
    const KIND: RequestKind = RequestKind::Key;

    fn id(&self) -> u64 {
        self.id
    }

    async fn exchange(
        &self,
        client: &dyn DecisionClient,
    ) -> Result<DecisionResponse, TransportError> {
        client.request_key(self).await
    }
}

#[async_trait]
impl Forwardable for SignRequest {
    const KIND: RequestKind = RequestKind::Signature;

    fn id(&self) -> u64 {
        self.id
    }

    async fn exchange(
        &self,
        client: &dyn DecisionClient,
    ) -> Result<DecisionResponse, TransportError> {
        client.request_signature(self).await
    }
}
