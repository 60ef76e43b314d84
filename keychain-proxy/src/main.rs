//! keychain-proxy - forwards keychain requests to a decision service

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};

use keychain_bridge::{Dispatcher, HttpDecisionClient};
use keychain_proxy::{logging, Args, StdioHost};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init(&args.log_level, args.log_format)?;

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let client_config = args.client_config()?;
    let proxy_url = client_config.base_url.clone();
    let client = HttpDecisionClient::new(client_config).context("building HTTP client")?;

    info!(
        proxy_url = %proxy_url,
        timeout_ms = client.timeout().as_millis() as u64,
        "Starting keychain-proxy"
    );
    let dispatcher = Dispatcher::new(Arc::new(client));
    let host = StdioHost::new(Arc::new(dispatcher));

    let summary = host
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!(
        dispatched = summary.dispatched,
        skipped = summary.skipped,
        "Input closed, all requests resolved"
    );

    Ok(())
}
