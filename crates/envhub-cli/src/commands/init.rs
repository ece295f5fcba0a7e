//! Init command handler

use anyhow::{Context, Result};

use envhub_core::config::DEFAULT_API_URL;
use envhub_core::{ConfigStore, IdentityBackend, LocalConfig};

use crate::output::Output;
use crate::prompt;

/// Write the local configuration
///
/// Azure AD needs a scope; the GitHub backend needs the API URL of its
/// deployment. Whichever is missing from the flags is prompted for.
pub fn run(
    store: &ConfigStore,
    backend: IdentityBackend,
    scope: Option<String>,
    api_url: Option<String>,
    output: &Output,
) -> Result<()> {
    let config = match backend {
        IdentityBackend::AzureAd => {
            let scope = match non_empty(scope) {
                Some(scope) => scope,
                None => prompt::required("Azure AD scope (e.g. api://<client-id>/.default)")?,
            };
            let api_url = non_empty(api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
            LocalConfig::new(&api_url, Some(scope), backend)
        }
        IdentityBackend::GithubCli => {
            let api_url = match non_empty(api_url) {
                Some(url) => url,
                None => prompt::required("API URL")?,
            };
            LocalConfig::new(&api_url, non_empty(scope), backend)
        }
    };

    store
        .save(&config)
        .context("Failed to save configuration")?;

    output.success(&format!(
        "Configuration saved to {}",
        store.path().display()
    ));
    match backend {
        IdentityBackend::AzureAd => output.message("Run `az login` if you have not already."),
        IdentityBackend::GithubCli => {
            output.message("Run `envhub login` if you have not already.")
        }
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
