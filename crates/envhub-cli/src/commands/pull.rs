//! Pull command handler

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use envhub_core::{envfile, Bundle, BundleId, ConfigStore};

use super::connect;
use crate::output::Output;

/// Download a version of a bundle to stdout or a file
///
/// Without a destination, stdout carries only the `KEY=VALUE` lines (or the
/// bundle as JSON with `--json`).
pub fn run(
    store: &ConfigStore,
    bundle: &BundleId,
    version: Option<i64>,
    dest: Option<&Path>,
    output: &Output,
) -> Result<()> {
    let config = store.load()?;
    let client = connect(&config)?;
    let pulled = client.pull(bundle, version).context("Pull failed")?;

    let Some(path) = dest else {
        return write_bundle(&mut io::stdout().lock(), &pulled, output);
    };

    envfile::write_file(path, &pulled.variables)?;

    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "status": "success",
                "version": pulled.version,
                "count": pulled.variables.len(),
                "path": path.display().to_string()
            })
        );
    } else {
        let version = pulled
            .version
            .map(|v| format!(" (version {})", v))
            .unwrap_or_default();
        output.success(&format!(
            "Saved {} variables{} to {}",
            pulled.variables.len(),
            version,
            path.display()
        ));
    }

    Ok(())
}

/// Write a pulled bundle with nothing around it
fn write_bundle(out: &mut impl Write, pulled: &Bundle, output: &Output) -> Result<()> {
    if output.is_json() {
        writeln!(out, "{}", serde_json::to_string_pretty(pulled)?)?;
    } else {
        out.write_all(envfile::serialize(&pulled.variables).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
