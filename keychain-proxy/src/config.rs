//! Configuration for keychain-proxy
//!
//! CLI arguments and environment variable handling using clap.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use keychain_bridge::{ClientConfig, Url};

/// Keychain proxy - remote decisions for key and signature requests
#[derive(Parser, Debug, Clone)]
#[command(name = "keychain-proxy")]
#[command(about = "Forwards keychain key and signature requests to a decision service")]
pub struct Args {
    /// Base URL of the decision service
    #[arg(long, env = "PROXY_URL", default_value = "http://localhost:8080")]
    pub proxy_url: String,

    /// Deadline for one exchange with the decision service, in milliseconds.
    /// Replaces the duration-string PROXY_TIMEOUT (e.g. "5s")
    #[arg(long, env = "PROXY_TIMEOUT_MS", default_value = "5000")]
    pub proxy_timeout_ms: u64,

    /// Former duration-string timeout, refused so it is never silently ignored
    #[arg(long, env = "PROXY_TIMEOUT", hide = true)]
    pub proxy_timeout: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

/// How log records are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Plain,
    /// One JSON object per line
    Json,
}

/// Invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PROXY_URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("PROXY_URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("PROXY_TIMEOUT_MS must be greater than zero")]
    ZeroTimeout,

    #[error("PROXY_TIMEOUT={0:?} is no longer read, set PROXY_TIMEOUT_MS in milliseconds instead")]
    RenamedTimeout(String),
}

impl Args {
    /// Check the configuration before any component is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client_config().map(|_| ())
    }

    /// Per-exchange timeout.
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }

    /// Connection settings for the decision client.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let base_url = Url::parse(&self.proxy_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.proxy_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.scheme().to_string()));
        }

        if let Some(legacy) = &self.proxy_timeout {
            return Err(ConfigError::RenamedTimeout(legacy.clone()));
        }

        if self.proxy_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(ClientConfig::new(base_url, self.proxy_timeout()))
    }
}
