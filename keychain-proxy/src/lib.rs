//! keychain-proxy: a keychain that asks a remote service for every decision
//!
//! Hosts the `keychain-bridge` dispatcher behind a line-delimited JSON pipe,
//! configured from flags and environment variables.

pub mod config;
pub mod logging;
pub mod stdio;

pub use config::{Args, ConfigError, LogFormat};
pub use stdio::{HostSummary, StdioHost};
