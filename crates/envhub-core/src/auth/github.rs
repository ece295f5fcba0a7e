//! GitHub CLI issued tokens
//!
//! The token is read from the locally installed `gh` binary. Two output
//! formats are supported:
//!
//! 1. `gh auth token` prints the bare token (current releases)
//! 2. `gh auth status --show-token` prints a status report containing a
//!    `Token: <token>` line (older releases, sometimes on stderr)
//!
//! Strategy 1 is tried first; strategy 2 only when 1 yields nothing.

use std::io;
use std::process::{Command, Output};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::{AuthError, AuthHeaders, CredentialProvider};

/// Default program name
const GH_PROGRAM: &str = "gh";

/// Environment variable overriding the `gh` path
const GH_PATH_ENV: &str = "ENVHUB_GH_PATH";

const INSTALL_HINT: &str = "Install the GitHub CLI from https://cli.github.com and run `envhub login`.";

/// `Token: <token>` on a single line, with a GitHub-issued prefix
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Token:[ \t]+((?:gh[oprsu]_|github_pat_)[A-Za-z0-9_]+)[ \t]*\r?$")
        .expect("token pattern is valid")
});

/// Bearer tokens from the GitHub CLI
#[derive(Debug, Clone)]
pub struct GhCliProvider {
    program: String,
}

impl GhCliProvider {
    pub fn new() -> Self {
        Self::with_program(GH_PROGRAM)
    }

    /// Use `ENVHUB_GH_PATH` if set, `gh` otherwise
    pub fn from_env() -> Self {
        match std::env::var(GH_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::with_program(path),
            _ => Self::new(),
        }
    }

    /// Run a specific binary instead of `gh`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Obtain a token, trying the direct then the status strategy
    pub fn token(&self) -> Result<String, AuthError> {
        let output = self.run(&["auth", "token"])?;
        if output.status.success() {
            if let Some(token) = token_from_direct_output(&String::from_utf8_lossy(&output.stdout))
            {
                debug!("Token obtained from `{} auth token`", self.program);
                return Ok(token);
            }
        }

        debug!(
            "`{} auth token` yielded no token, falling back to auth status",
            self.program
        );
        let output = self.run(&["auth", "status", "--show-token"])?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        token_from_status_output(&text).ok_or_else(|| AuthError::NoCredential {
            tool: self.program.clone(),
        })
    }

    /// Run the interactive `gh auth login` flow
    ///
    /// The child inherits this process's stdio.
    pub fn login(&self) -> Result<(), AuthError> {
        info!("Starting `{} auth login`", self.program);
        let status = Command::new(&self.program)
            .args(["auth", "login"])
            .status()
            .map_err(|e| self.spawn_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(AuthError::LoginFailed {
                tool: self.program.clone(),
                code: status.code(),
            })
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, AuthError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, error: io::Error) -> AuthError {
        match error.kind() {
            io::ErrorKind::NotFound => AuthError::ToolNotInstalled {
                tool: self.program.clone(),
                hint: INSTALL_HINT,
            },
            _ => AuthError::AuthenticationFailed {
                backend: "github-cli",
                cause: format!("failed to run `{}`: {}", self.program, error),
            },
        }
    }
}

impl Default for GhCliProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider for GhCliProvider {
    fn name(&self) -> &'static str {
        "github-cli"
    }

    fn headers(&self) -> Result<AuthHeaders, AuthError> {
        let token = self.token()?;
        Ok(AuthHeaders::bearer(&token))
    }
}

/// Extract the token printed by `gh auth token`
///
/// Takes the first non-empty line; anything containing whitespace is not a
/// token.
pub fn token_from_direct_output(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().any(char::is_whitespace) {
        return None;
    }
    Some(line.to_string())
}

/// Extract the token from `gh auth status --show-token` output
///
/// Only unmasked tokens with a GitHub prefix match.
pub fn token_from_status_output(text: &str) -> Option<String> {
    TOKEN_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
