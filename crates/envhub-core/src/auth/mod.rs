//! Credential providers
//!
//! Every request to the remote API carries headers produced by a
//! [`CredentialProvider`]. Three providers exist:
//!
//! - [`LocalProvider`]: fixed development identity, loopback endpoints only
//! - [`AzureAdProvider`]: bearer token from the Azure identity broker
//! - [`GhCliProvider`]: bearer token issued by the GitHub CLI
//!
//! Which one is used is decided by [`select_provider`], never by the
//! providers themselves. Credentials are acquired fresh on every call and
//! never persisted.

mod azure;
mod github;
mod local;

pub use azure::{
    AzureAdProvider, BrokerError, DefaultAzureBroker, EnvironmentCredential, IdentityBroker,
    ManagedIdentityCredential, WorkloadIdentityCredential, DEFAULT_SCOPE,
};
pub use github::{token_from_direct_output, token_from_status_output, GhCliProvider};
pub use local::{LocalProvider, LOCAL_USER_ID};

use std::net::IpAddr;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::config::{IdentityBackend, LocalConfig};

/// Errors acquiring credentials
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity backend could not produce a token
    #[error("Authentication failed ({backend}): {cause}")]
    AuthenticationFailed { backend: &'static str, cause: String },

    /// The external identity tool is not on PATH
    #[error("`{tool}` is not installed or not on PATH")]
    ToolNotInstalled { tool: String, hint: &'static str },

    /// The identity tool ran but yielded no token
    #[error("No credential available from `{tool}`")]
    NoCredential { tool: String },

    /// Interactive login exited unsuccessfully
    #[error("`{tool} auth login` failed{}", exit_code_suffix(.code))]
    LoginFailed { tool: String, code: Option<i32> },
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl AuthError {
    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            AuthError::AuthenticationFailed { backend, .. } => {
                if *backend == IdentityBackend::AzureAd.as_str() {
                    Some("Run `az login` to authenticate.")
                } else {
                    Some("Run `envhub login` to authenticate.")
                }
            }
            AuthError::ToolNotInstalled { hint, .. } => Some(*hint),
            AuthError::NoCredential { .. } => Some("Run `envhub login` to authenticate."),
            AuthError::LoginFailed { .. } => None,
        }
    }
}

/// HTTP headers authenticating one request
///
/// Header values are redacted from `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    headers: Vec<(String, String)>,
}

impl AuthHeaders {
    /// Headers carrying `Authorization: Bearer <token>`
    pub fn bearer(token: &str) -> Self {
        Self::default().with("Authorization", format!("Bearer {}", token))
    }

    /// Add a header
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value (case-insensitive name)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.headers.iter().map(|(n, _)| (n, "<redacted>")))
            .finish()
    }
}

/// Source of authentication headers for remote calls
pub trait CredentialProvider {
    /// Short name for logs and messages
    fn name(&self) -> &'static str;

    /// Acquire headers for one request
    fn headers(&self) -> Result<AuthHeaders, AuthError>;
}

/// Check whether an API URL points at the local machine
///
/// Matches `localhost`, `127.0.0.0/8` and `::1`. Unparseable URLs are
/// treated as remote.
pub fn is_loopback(api_url: &str) -> bool {
    let Ok(url) = Url::parse(api_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Pick the credential provider for a configuration
///
/// Loopback endpoints always get the [`LocalProvider`]; everything else
/// uses the configured identity backend.
pub fn select_provider(config: &LocalConfig) -> Box<dyn CredentialProvider> {
    if let Some(local) = LocalProvider::for_endpoint(&config.api_url) {
        debug!(api_url = %config.api_url, "Loopback endpoint, using local identity");
        return Box::new(local);
    }

    match config.backend {
        IdentityBackend::AzureAd => Box::new(AzureAdProvider::new(config.scope.as_deref())),
        IdentityBackend::GithubCli => Box::new(GhCliProvider::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str, backend: IdentityBackend) -> LocalConfig {
        LocalConfig::new(api_url, Some("api://app/.default".to_string()), backend)
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback("http://localhost:3000/api"));
        assert!(is_loopback("http://LOCALHOST/api"));
        assert!(is_loopback("http://127.0.0.1:7071/api"));
        assert!(is_loopback("http://127.1.2.3/api"));
        assert!(is_loopback("http://[::1]:8080/api"));

        assert!(!is_loopback("https://envecl.azurewebsites.net/api"));
        assert!(!is_loopback("https://localhost.example.com/api"));
        assert!(!is_loopback("https://example.com/localhost"));
        assert!(!is_loopback("http://10.0.0.1/api"));
        assert!(!is_loopback("not a url"));
    }

    #[test]
    fn test_loopback_always_uses_local_provider() {
        for backend in [IdentityBackend::AzureAd, IdentityBackend::GithubCli] {
            let provider = select_provider(&config("http://localhost:3000/api", backend));
            assert_eq!(provider.name(), "local");

            let headers = provider.headers().unwrap();
            assert_eq!(headers.get("x-user-id"), Some(LOCAL_USER_ID));
            assert!(headers.get("Authorization").is_none());
        }
    }

    #[test]
    fn test_remote_never_uses_local_provider() {
        let provider =
            select_provider(&config("https://example.com/api", IdentityBackend::AzureAd));
        assert_eq!(provider.name(), "azure-ad");

        let provider =
            select_provider(&config("https://example.com/api", IdentityBackend::GithubCli));
        assert_eq!(provider.name(), "github-cli");
    }

    #[test]
    fn test_bearer_headers() {
        let headers = AuthHeaders::bearer("abc123");
        assert_eq!(headers.get("authorization"), Some("Bearer abc123"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_debug_redacts_values() {
        let headers = AuthHeaders::bearer("super-secret-token");
        let debug = format!("{:?}", headers);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn test_error_suggestions() {
        let err = AuthError::AuthenticationFailed {
            backend: "azure-ad",
            cause: "no cached account".to_string(),
        };
        assert_eq!(
            err.recovery_suggestion(),
            Some("Run `az login` to authenticate.")
        );
        assert!(err.to_string().contains("no cached account"));

        let err = AuthError::NoCredential {
            tool: "gh".to_string(),
        };
        assert_eq!(
            err.recovery_suggestion(),
            Some("Run `envhub login` to authenticate.")
        );

        let err = AuthError::LoginFailed {
            tool: "gh".to_string(),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "`gh auth login` failed with exit code 1");
    }
}
