//! Per-request log record.
//!
//! A `RequestRecord` is created when a request arrives and passed down the
//! dispatcher's call sequence. Every event it emits carries the request kind
//! and id, so all log lines for one request can be correlated.

use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{ResolveError, TransportError};
use crate::request::RequestKind;

/// Lifecycle of a forwarded request.
///
/// `Received → Forwarding → {Fulfilled | RejectedByDecision | RejectedByTransportFailure}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Forwarding,
    Fulfilled,
    RejectedByDecision,
    RejectedByTransportFailure,
}

impl RequestState {
    /// Whether the request has reached its final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Fulfilled
                | RequestState::RejectedByDecision
                | RequestState::RejectedByTransportFailure
        )
    }
}

/// Structured record of one request's handling.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    kind: RequestKind,
    id: u64,
    state: RequestState,
    /// Decision service's reason, for decision rejections
    reason: Option<String>,
    /// Short cause and full message, for transport failures
    failure: Option<(&'static str, String)>,
    resolution_error: Option<String>,
    started: Instant,
}

impl RequestRecord {
    /// Start a record for a request that just arrived.
    pub fn received(kind: RequestKind, id: u64) -> Self {
        Self {
            kind,
            id,
            state: RequestState::Received,
            reason: None,
            failure: None,
            resolution_error: None,
            started: Instant::now(),
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Rejection reason given by the decision service.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Short transport failure cause (`timeout`, `decoding`, ...).
    pub fn cause(&self) -> Option<&'static str> {
        self.failure.as_ref().map(|(cause, _)| *cause)
    }

    /// Full transport failure message, including status and body when
    /// the decision service answered with an error status.
    pub fn error(&self) -> Option<&str> {
        self.failure.as_ref().map(|(_, message)| message.as_str())
    }

    /// Why the continuation could not be resolved, if it could not.
    pub fn resolution_error(&self) -> Option<&str> {
        self.resolution_error.as_deref()
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn transition(&mut self, next: RequestState) {
        debug_assert!(
            !self.state.is_terminal(),
            "request {} left terminal state {:?}",
            self.id,
            self.state
        );
        self.state = next;
    }

    /// The exchange with the decision service is starting.
    pub fn forwarding(&mut self) {
        self.transition(RequestState::Forwarding);
        debug!(kind = %self.kind, id = self.id, "forwarding {} request", self.kind);
    }

    /// The decision service approved the request.
    pub fn fulfilled(&mut self) {
        self.transition(RequestState::Fulfilled);
        info!(
            kind = %self.kind,
            id = self.id,
            elapsed_ms = self.elapsed_ms(),
            "{} request fulfilled",
            self.kind
        );
    }

    /// The decision service denied the request.
    pub fn rejected_by_decision(&mut self, reason: &str) {
        self.transition(RequestState::RejectedByDecision);
        self.reason = Some(reason.to_string());
        error!(
            kind = %self.kind,
            id = self.id,
            reason,
            "{} request rejected",
            self.kind
        );
    }

    /// The exchange failed before a decision was obtained.
    pub fn transport_failed(&mut self, err: &TransportError) {
        self.transition(RequestState::RejectedByTransportFailure);
        self.failure = Some((err.cause(), err.to_string()));
        error!(
            kind = %self.kind,
            id = self.id,
            cause = err.cause(),
            error = %err,
            "proxying {} request",
            self.kind
        );
    }

    /// The custody application could not take the resolution.
    pub fn resolution_failed(&mut self, err: &ResolveError) {
        self.resolution_error = Some(err.to_string());
        let action = match self.state {
            RequestState::Fulfilled => "fulfilling",
            _ => "rejecting",
        };
        error!(
            kind = %self.kind,
            id = self.id,
            error = %err,
            "{} {} request",
            action,
            self.kind
        );
    }
}
