//! Transport to the decision service.
//!
//! Provides a trait-based interface so the dispatcher does not care how the
//! decision service is reached:
//! - HTTP/JSON (the production transport)
//! - Mock client for testing

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpDecisionClient;
pub use mock::{MockDecisionClient, MockReply};
pub use traits::{ClientConfig, DecisionClient, DecisionResponse};
