//! envhub CLI
//!
//! Command-line interface for envhub - versioned environment variable
//! bundles stored behind a remote API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use envhub_core::{
    AuthError, BundleId, ConfigError, ConfigStore, EnvFileError, IdentityBackend, SyncError,
};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "ENVHUB_LOG";

#[derive(Parser)]
#[command(name = "envhub")]
#[command(about = "envhub - Versioned environment variable bundles")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log more (repeat for debug output)
    #[arg(long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the local configuration (first-time setup)
    Init {
        /// Identity backend used to authenticate
        #[arg(long, value_name = "azure-ad|github-cli")]
        backend: Option<IdentityBackend>,
        /// Token scope requested from Azure AD (prompted if omitted)
        #[arg(long)]
        scope: Option<String>,
        /// Base URL of the remote API
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Log in through the GitHub CLI
    Login,
    /// Upload a .env file as a new version
    Push {
        #[command(flatten)]
        bundle: BundleArgs,
        /// File to read variables from
        #[arg(short, long, default_value = ".env")]
        file: PathBuf,
        /// Reason for the change (prompted if omitted)
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Download a version of a bundle
    Pull {
        #[command(flatten)]
        bundle: BundleArgs,
        /// Version to fetch (latest if omitted)
        #[arg(short, long, allow_negative_numbers = true)]
        version: Option<i64>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the versions of a bundle
    History {
        #[command(flatten)]
        bundle: BundleArgs,
    },
    /// Show current configuration
    Config,
}

/// Flags naming one bundle
#[derive(Args, Debug, Clone)]
struct BundleArgs {
    /// Project name
    #[arg(short, long)]
    project: String,
    /// Service name
    #[arg(short, long)]
    service: String,
    /// Environment name (dev, staging, prod, ...)
    #[arg(short, long, visible_alias = "env")]
    environment: String,
}

impl BundleArgs {
    fn bundle_id(&self) -> BundleId {
        BundleId::new(&self.project, &self.service, &self.environment)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let store = ConfigStore::new(cli.config.unwrap_or_else(ConfigStore::default_path));

    match cli.command {
        Commands::Init {
            backend,
            scope,
            api_url,
        } => commands::init::run(&store, backend.unwrap_or_default(), scope, api_url, output),
        Commands::Login => commands::login::run(&store, output),
        Commands::Push {
            bundle,
            file,
            reason,
        } => commands::push::run(&store, &bundle.bundle_id(), &file, reason, output),
        Commands::Pull {
            bundle,
            version,
            output: dest,
        } => commands::pull::run(&store, &bundle.bundle_id(), version, dest.as_deref(), output),
        Commands::History { bundle } => commands::history::run(&store, &bundle.bundle_id(), output),
        Commands::Config => commands::config::show(&store, output),
    }
}

/// Initialize stderr logging
///
/// `ENVHUB_LOG` takes a full filter directive; otherwise the level follows
/// `--verbose`.
fn init_logging(verbose: u8) {
    let env_filter = match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.is_empty() => EnvFilter::new(directive),
        _ => {
            let level = match verbose {
                0 => "warn",
                1 => "info",
                _ => "debug",
            };
            EnvFilter::new(format!("envhub_core={},envhub={}", level, level))
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print an error and its remediation to stderr
fn report_error(error: &anyhow::Error) {
    eprintln!("Error: {:#}", error);
    if let Some(suggestion) = recovery_suggestion(error) {
        eprintln!();
        eprintln!("{}", suggestion);
    }
}

/// Find the first known error in the chain that suggests a fix
fn recovery_suggestion(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            e.recovery_suggestion()
        } else if let Some(e) = cause.downcast_ref::<AuthError>() {
            e.recovery_suggestion()
        } else if let Some(e) = cause.downcast_ref::<EnvFileError>() {
            e.recovery_suggestion()
        } else if let Some(e) = cause.downcast_ref::<SyncError>() {
            e.recovery_suggestion()
        } else {
            None
        }
    })
}
