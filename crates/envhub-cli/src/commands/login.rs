//! Login command handler

use anyhow::{bail, Context, Result};

use envhub_core::auth::GhCliProvider;
use envhub_core::{ConfigStore, IdentityBackend};

use crate::output::Output;

/// Run the GitHub CLI login flow and check a token is now available
pub fn run(store: &ConfigStore, output: &Output) -> Result<()> {
    let config = store.load()?;

    match config.backend {
        IdentityBackend::AzureAd => {
            bail!(
                "`envhub login` is only used with the github-cli backend.\n\
                 For Azure AD, sign in with:\n  \
                 az login"
            );
        }
        IdentityBackend::GithubCli => {
            let provider = GhCliProvider::from_env();
            provider.login()?;
            provider
                .token()
                .context("Login finished but no token is available")?;
            output.success("Logged in with the GitHub CLI");
        }
    }

    Ok(())
}
