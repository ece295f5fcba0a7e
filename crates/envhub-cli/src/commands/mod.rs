//! Command handlers

pub mod config;
pub mod history;
pub mod init;
pub mod login;
pub mod pull;
pub mod push;

use anyhow::{Context, Result};
use tracing::debug;

use envhub_core::{select_provider, LocalConfig, SyncClient};

/// Acquire credentials and build a client for the configured API
pub fn connect(config: &LocalConfig) -> Result<SyncClient> {
    let provider = select_provider(config);
    debug!(provider = provider.name(), api_url = %config.api_url, "Acquiring credentials");

    let headers = provider.headers()?;
    SyncClient::new(&config.api_url, headers).context("Failed to create HTTP client")
}
