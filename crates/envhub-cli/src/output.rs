//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Progress notes go to stderr so stdout stays pipeable.

use std::io::{self, Write};
use std::path::Path;

use envhub_core::{LocalConfig, VersionInfo};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Write version history as a table
    pub fn write_history(&self, out: &mut impl Write, history: &[VersionInfo]) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => {
                if history.is_empty() {
                    return writeln!(out, "No history found.");
                }
                write!(out, "{}", history_table(history))
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(history).map_err(io::Error::other)?;
                writeln!(out, "{}", json)
            }
            OutputFormat::Quiet => {
                for entry in history {
                    writeln!(out, "{}", entry.version)?;
                }
                Ok(())
            }
        }
    }

    /// Print the loaded configuration and where it came from
    pub fn print_config(&self, config: &LocalConfig, path: &Path) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "api_url": config.api_url,
                        "scope": config.scope,
                        "backend": config.backend.as_str(),
                        "config_file": path.display().to_string()
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", config.api_url);
            }
            OutputFormat::Human => {
                println!("Configuration:");
                println!("  api_url: {}", config.api_url);
                println!("  backend: {}", config.backend);
                println!(
                    "  scope:   {}",
                    config.scope.as_deref().unwrap_or("(not set)")
                );
                println!();
                println!("Config file: {}", path.display());
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a progress note to stderr (human mode only)
    pub fn progress(&self, msg: &str) {
        if self.format == OutputFormat::Human {
            eprintln!("{}", msg);
        }
    }
}

const HISTORY_HEADERS: [&str; 4] = ["Version", "Date", "User", "Reason"];

/// Render history rows as left-aligned columns
fn history_table(history: &[VersionInfo]) -> String {
    let rows: Vec<[String; 4]> = history
        .iter()
        .map(|entry| {
            [
                entry.version.to_string(),
                entry.created_at_display(),
                entry.created_by.clone(),
                entry.change_reason.clone(),
            ]
        })
        .collect();

    let mut widths = HISTORY_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let headers = HISTORY_HEADERS.map(str::to_string);
    let rule = widths.map(|w| "-".repeat(w));
    for line in std::iter::once(&headers)
        .chain(std::iter::once(&rule))
        .chain(rows.iter())
    {
        let cells: Vec<String> = line
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}
