//! History command handler

use std::io::{self, Write};

use anyhow::{Context, Result};

use envhub_core::sync::Transport;
use envhub_core::{BundleId, ConfigStore, SyncClient};

use super::connect;
use crate::output::Output;

/// List the versions of a bundle, in the order the server returns them
pub fn run(store: &ConfigStore, bundle: &BundleId, output: &Output) -> Result<()> {
    let config = store.load()?;
    let client = connect(&config)?;
    show(&client, bundle, output, &mut io::stdout().lock())
}

fn show<T: Transport>(
    client: &SyncClient<T>,
    bundle: &BundleId,
    output: &Output,
    out: &mut impl Write,
) -> Result<()> {
    let history = client
        .history(bundle)
        .context("Failed to fetch history")?;

    output.write_history(out, &history)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::Canned;
    use crate::output::OutputFormat;
    use envhub_core::AuthHeaders;

    fn run_show(body: &str, format: OutputFormat) -> Result<String> {
        let client = SyncClient::with_transport(
            "http://localhost:7071/api",
            AuthHeaders::default(),
            Canned::new(200, body),
        );
        let mut out = Vec::new();
        show(
            &client,
            &BundleId::new("shop", "api", "dev"),
            &Output::new(format),
            &mut out,
        )?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_empty_history_succeeds_with_message() {
        assert_eq!(
            run_show(r#"{"history": []}"#, OutputFormat::Human).unwrap(),
            "No history found.\n"
        );
        assert_eq!(
            run_show("{}", OutputFormat::Human).unwrap(),
            "No history found.\n"
        );
    }

    #[test]
    fn test_history_rows_in_server_order() {
        let body = r#"{"history": [
            {"version": 2, "created_at": "x", "created_by": "bob", "change_reason": "second"},
            {"version": 1, "created_at": "x", "created_by": "alice", "change_reason": "first"}
        ]}"#;
        assert_eq!(run_show(body, OutputFormat::Quiet).unwrap(), "2\n1\n");
    }

    #[test]
    fn test_remote_error_fails_command() {
        let client = SyncClient::with_transport(
            "http://localhost:7071/api",
            AuthHeaders::default(),
            Canned::new(404, "Environment not found"),
        );
        let mut out = Vec::new();
        let err = show(
            &client,
            &BundleId::new("shop", "api", "dev"),
            &Output::new(OutputFormat::Human),
            &mut out,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Error 404: Environment not found"));
        assert!(out.is_empty());
    }
}
