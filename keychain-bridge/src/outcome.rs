//! Classification of exchange results into terminal actions.

use crate::client::DecisionResponse;
use crate::error::TransportError;

/// What the dispatcher must do with a request's continuation.
#[derive(Debug)]
pub enum Outcome {
    /// Approved; fulfil with the payload as received
    Fulfil(Vec<u8>),
    /// Denied by the decision service; reject with its reason verbatim
    RejectByDecision(String),
    /// Exchange failed; reject with a generic reason and log the error
    RejectByTransportFailure(TransportError),
}

/// Interpret the result of one exchange.
pub fn interpret(result: Result<DecisionResponse, TransportError>) -> Outcome {
    match result {
        Ok(DecisionResponse {
            ok: true, payload, ..
        }) => Outcome::Fulfil(payload),
        Ok(DecisionResponse { reject_reason, .. }) => Outcome::RejectByDecision(reject_reason),
        Err(err) => Outcome::RejectByTransportFailure(err),
    }
}
