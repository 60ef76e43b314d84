//! Tracing setup.
//!
//! Logs go to stderr; stdout carries resolutions for the custody process.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter for a given level: our crates at `level`, dependencies at warn.
pub fn default_directives(level: &str) -> String {
    format!("keychain_proxy={level},keychain_bridge={level},warn")
}

/// Build the filter. `RUST_LOG` wins when set.
pub fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_directives(level))?),
    }
}

/// Install the global subscriber.
pub fn init(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(level)?);

    match format {
        LogFormat::Plain => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}
