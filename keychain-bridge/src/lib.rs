//! Keychain Bridge - remote decisions for key custody
//!
//! A custody application cannot decide on its own whether to hand out key
//! material or a signature. It hands each request to this crate, which
//! forwards it to a decision service and resolves the request with the
//! answer:
//! - Trait-based transport to the decision service (HTTP, mock)
//! - Pure interpretation of transport results into terminal outcomes
//! - A dispatcher that resolves every request exactly once
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Custody application               │
//! │  (KeyRequest / SignRequest + handle)    │
//! └────────────────┬────────────────────────┘
//!                  │ RequestHandler
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │            Dispatcher                   │
//! │  (RequestRecord per request)            │
//! └──────┬──────────────────────┬───────────┘
//!        ▼                      ▼
//! ┌──────────────┐       ┌──────────────┐
//! │DecisionClient│──────▶│   outcome    │
//! │ (HTTP/Mock)  │       │  interpret   │
//! └──────────────┘       └──────────────┘
//! ```

pub mod client;
pub mod continuation;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod outcome;
pub mod record;
pub mod request;

// Re-export main types for convenience
pub use client::{ClientConfig, DecisionClient, DecisionResponse, HttpDecisionClient, MockDecisionClient};
pub use continuation::{oneshot, Continuation, OneshotContinuation, Resolution};
pub use dispatcher::{Dispatcher, RequestHandler, INTERNAL_ERROR_REASON};
pub use error::{ResolveError, TransportError};
pub use outcome::Outcome;
pub use record::{RequestRecord, RequestState};
pub use request::{Coin, Forwardable, KeyRequest, KeyType, RequestKind, SignRequest};
pub use reqwest::Url;
