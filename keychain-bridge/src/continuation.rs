//! One-shot handles used to resolve a pending request.
//!
//! Both terminal operations consume the handle, so a request cannot be
//! resolved twice.

use tokio::sync::oneshot as tokio_oneshot;

use crate::error::ResolveError;

/// Resolution handle for a single request, supplied by the custody
/// application.
pub trait Continuation: Send {
    /// Approve the request with `payload` (key material or signature).
    fn fulfil(self: Box<Self>, payload: Vec<u8>) -> Result<(), ResolveError>;

    /// Deny the request with a human-readable reason.
    fn reject(self: Box<Self>, reason: String) -> Result<(), ResolveError>;
}

/// How a request ended, as seen by the custody application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Fulfilled(Vec<u8>),
    Rejected(String),
}

/// Continuation that hands its resolution to a oneshot receiver.
#[derive(Debug)]
pub struct OneshotContinuation {
    sender: tokio_oneshot::Sender<Resolution>,
}

/// Create a continuation and the receiver its resolution arrives on.
pub fn oneshot() -> (OneshotContinuation, tokio_oneshot::Receiver<Resolution>) {
    let (sender, receiver) = tokio_oneshot::channel();
    (OneshotContinuation { sender }, receiver)
}

impl OneshotContinuation {
    fn deliver(self, resolution: Resolution) -> Result<(), ResolveError> {
        self.sender
            .send(resolution)
            .map_err(|_| ResolveError::Undeliverable("receiver dropped".to_string()))
    }
}

impl Continuation for OneshotContinuation {
    fn fulfil(self: Box<Self>, payload: Vec<u8>) -> Result<(), ResolveError> {
        self.deliver(Resolution::Fulfilled(payload))
    }

    fn reject(self: Box<Self>, reason: String) -> Result<(), ResolveError> {
        self.deliver(Resolution::Rejected(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fulfil_reaches_receiver() {
        let (continuation, receiver) = oneshot();

        Box::new(continuation).fulfil(b"abcd".to_vec()).unwrap();

        assert_eq!(receiver.await.unwrap(), Resolution::Fulfilled(b"abcd".to_vec()));
    }

    #[tokio::test]
    async fn test_reject_reaches_receiver() {
        let (continuation, receiver) = oneshot();

        Box::new(continuation).reject("nope".to_string()).unwrap();

        assert_eq!(receiver.await.unwrap(), Resolution::Rejected("nope".to_string()));
    }

    #[test]
    fn test_dropped_receiver_is_undeliverable() {
        let (continuation, receiver) = oneshot();
        drop(receiver);

        let err = Box::new(continuation).fulfil(Vec::new()).unwrap_err();
        assert!(matches!(err, ResolveError::Undeliverable(_)));
    }
}
