//! Config command handler

use anyhow::Result;

use envhub_core::ConfigStore;

use crate::output::Output;

/// Show current configuration, environment overrides applied
pub fn show(store: &ConfigStore, output: &Output) -> Result<()> {
    let config = store.load()?;
    output.print_config(&config, store.path());
    Ok(())
}
