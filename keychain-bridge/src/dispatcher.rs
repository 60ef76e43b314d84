//! Dispatcher - forwards custody requests to the decision service.
//!
//! Every request handed to the dispatcher is resolved exactly once:
//! fulfilled with the approved payload, rejected with the decision
//! service's reason, or rejected with a generic reason when the exchange
//! failed. Transport details never reach the custody application.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::DecisionClient;
use crate::continuation::Continuation;
use crate::outcome::{self, Outcome};
use crate::record::RequestRecord;
use crate::request::{Forwardable, KeyRequest, SignRequest};

/// Reason given to the custody application when the exchange failed.
pub const INTERNAL_ERROR_REASON: &str = "internal error";

/// Callbacks the custody application invokes, one per request kind.
///
/// The custody application may call these concurrently, once per inbound
/// request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_key_request(&self, request: KeyRequest, continuation: Box<dyn Continuation>);

    async fn handle_sign_request(&self, request: SignRequest, continuation: Box<dyn Continuation>);
}

/// Forwards requests to a decision client and resolves their continuations.
///
/// Holds no per-request state; the client is the only shared resource.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn DecisionClient>,
}

impl Dispatcher {
    /// Create a dispatcher over the given decision client.
    pub fn new(client: Arc<dyn DecisionClient>) -> Self {
        Self { client }
    }

    /// Forward one request and resolve its continuation.
    ///
    /// Returns the finished record, always in a terminal state.
    pub async fn forward<R: Forwardable>(
        &self,
        request: R,
        continuation: Box<dyn Continuation>,
    ) -> RequestRecord {
        let mut record = RequestRecord::received(R::KIND, request.id());

        record.forwarding();
        let result = request.exchange(self.client.as_ref()).await;

        let resolved = match outcome::interpret(result) {
            Outcome::Fulfil(payload) => {
                record.fulfilled();
                continuation.fulfil(payload)
            }
            Outcome::RejectByDecision(reason) => {
                record.rejected_by_decision(&reason);
                continuation.reject(reason)
            }
            Outcome::RejectByTransportFailure(err) => {
                record.transport_failed(&err);
                continuation.reject(INTERNAL_ERROR_REASON.to_string())
            }
        };

        if let Err(err) = resolved {
            record.resolution_failed(&err);
        }

        record
    }
}

#[async_trait]
impl RequestHandler for Dispatcher {
    async fn handle_key_request(&self, request: KeyRequest, continuation: Box<dyn Continuation>) {
        self.forward(request, continuation).await;
    }

    async fn handle_sign_request(&self, request: SignRequest, continuation: Box<dyn Continuation>) {
        self.forward(request, continuation).await;
    }
}
