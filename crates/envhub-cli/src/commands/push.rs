//! Push command handler

use std::path::Path;

use anyhow::{Context, Result};

use envhub_core::{envfile, BundleId, ConfigStore};

use super::connect;
use crate::output::{Output, OutputFormat};
use crate::prompt;

/// Upload a .env file as the next version of a bundle
pub fn run(
    store: &ConfigStore,
    bundle: &BundleId,
    file: &Path,
    reason: Option<String>,
    output: &Output,
) -> Result<()> {
    let config = store.load()?;
    let variables = envfile::read_file(file)?;

    let reason = match reason.filter(|r| !r.trim().is_empty()) {
        Some(reason) => reason,
        None => prompt::required("Reason for change")?,
    };

    let client = connect(&config)?;
    output.progress(&format!(
        "Pushing {} variables to {}...",
        variables.len(),
        bundle
    ));
    let outcome = client
        .push(bundle, &variables, &reason)
        .context("Push failed")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "status": "success",
                    "version": outcome.version,
                    "message": outcome.message
                })
            );
        }
        OutputFormat::Quiet => println!("{}", outcome.version),
        OutputFormat::Human => {
            output.success(&format!("Version {} deployed.", outcome.version));
            if let Some(ref message) = outcome.message {
                output.message(message);
            }
        }
    }

    Ok(())
}
