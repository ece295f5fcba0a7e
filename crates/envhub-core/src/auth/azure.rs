//! Azure AD delegated identity
//!
//! Tokens come from an [`IdentityBroker`]. The default broker tries, in order:
//!
//! 1. Client credentials from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
//!    `AZURE_CLIENT_SECRET`
//! 2. Workload identity: a federated token read from
//!    `AZURE_FEDERATED_TOKEN_FILE` (AKS, GitHub Actions OIDC)
//! 3. App Service / Functions managed identity (`IDENTITY_ENDPOINT` and
//!    `IDENTITY_HEADER`)
//! 4. The Azure CLI session (`az account get-access-token`)
//! 5. The VM instance metadata service (IMDS), with a short connect timeout
//!
//! IMDS is unreachable off Azure, so it is tried last.
//!
//! No interactive login is ever started here; a missing session surfaces
//! as [`AuthError::AuthenticationFailed`] telling the user to run `az login`.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{AuthError, AuthHeaders, CredentialProvider};

/// Scope requested when none is configured
pub const DEFAULT_SCOPE: &str = "https://management.azure.com/.default";

/// Default Azure AD authority
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance metadata token endpoint
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// IMDS is link-local; anything slower than this means it is not there
const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const JWT_BEARER_ASSERTION: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Failure to obtain a token from a broker
#[derive(Error, Debug)]
#[error("{0}")]
pub struct BrokerError(pub String);

/// Platform service issuing short-lived tokens for a scope
pub trait IdentityBroker {
    fn get_token(&self, scope: &str) -> Result<String, BrokerError>;
}

/// Bearer tokens from Azure AD
pub struct AzureAdProvider {
    scope: String,
    broker: Box<dyn IdentityBroker>,
}

impl AzureAdProvider {
    /// Create a provider using the default broker chain
    ///
    /// Falls back to [`DEFAULT_SCOPE`] when `scope` is unset.
    pub fn new(scope: Option<&str>) -> Self {
        Self::with_broker(scope, Box::new(DefaultAzureBroker::new()))
    }

    /// Create a provider with a specific broker
    pub fn with_broker(scope: Option<&str>, broker: Box<dyn IdentityBroker>) -> Self {
        let scope = match scope {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => DEFAULT_SCOPE.to_string(),
        };
        Self { scope, broker }
    }

    /// Scope that will be requested
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl CredentialProvider for AzureAdProvider {
    fn name(&self) -> &'static str {
        "azure-ad"
    }

    fn headers(&self) -> Result<AuthHeaders, AuthError> {
        info!(scope = %self.scope, "Acquiring Azure access token");
        let token = self
            .broker
            .get_token(&self.scope)
            .map_err(|e| AuthError::AuthenticationFailed {
                backend: self.name(),
                cause: e.to_string(),
            })?;
        Ok(AuthHeaders::bearer(&token))
    }
}

/// Environment client credentials, then the Azure CLI
#[derive(Debug, Clone)]
pub struct DefaultAzureBroker {
    az_program: String,
}

impl DefaultAzureBroker {
    pub fn new() -> Self {
        Self {
            az_program: "az".to_string(),
        }
    }
}

impl Default for DefaultAzureBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityBroker for DefaultAzureBroker {
    fn get_token(&self, scope: &str) -> Result<String, BrokerError> {
        let mut failures = Vec::new();

        match EnvironmentCredential::from_env() {
            Some(credential) => match credential.get_token(scope) {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("environment credential: {}", e)),
            },
            None => debug!("Azure client credentials not set in environment"),
        }

        match WorkloadIdentityCredential::from_env() {
            Some(credential) => match credential.get_token(scope) {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("workload identity: {}", e)),
            },
            None => debug!("Azure federated token file not set in environment"),
        }

        match ManagedIdentityCredential::app_service_from_env() {
            Some(credential) => match credential.get_token(scope) {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("app service managed identity: {}", e)),
            },
            None => debug!("App Service identity endpoint not set in environment"),
        }

        match azure_cli_token(&self.az_program, scope) {
            Ok(token) => return Ok(token),
            Err(e) => failures.push(format!("azure cli: {}", e)),
        }

        match ManagedIdentityCredential::imds().get_token(scope) {
            Ok(token) => return Ok(token),
            Err(e) => failures.push(format!("managed identity: {}", e)),
        }

        Err(BrokerError(failures.join("; ")))
    }
}

/// Client-credentials grant against the Azure AD token endpoint
#[derive(Clone)]
pub struct EnvironmentCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
}

impl std::fmt::Debug for EnvironmentCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl EnvironmentCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    /// Use a different authority (sovereign clouds, tests)
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Read credentials from `AZURE_*` variables
    ///
    /// Returns `None` unless tenant, client id and secret are all set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let credential = Self::new(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
        );
        Some(match var("AZURE_AUTHORITY_HOST") {
            Some(host) => credential.with_authority_host(host),
            None => credential,
        })
    }

    /// Request a token for `scope`
    pub fn get_token(&self, scope: &str) -> Result<String, BrokerError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];
        request_token(&token_url(&self.authority_host, &self.tenant_id), &params)
    }
}

/// Client-credentials grant using a federated token as client assertion
#[derive(Debug, Clone)]
pub struct WorkloadIdentityCredential {
    tenant_id: String,
    client_id: String,
    token_file: PathBuf,
    authority_host: String,
}

impl WorkloadIdentityCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        token_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            token_file: token_file.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Read `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_FEDERATED_TOKEN_FILE`
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let credential = Self::new(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_FEDERATED_TOKEN_FILE")?,
        );
        Some(match var("AZURE_AUTHORITY_HOST") {
            Some(host) => credential.with_authority_host(host),
            None => credential,
        })
    }

    /// Request a token for `scope`
    ///
    /// The token file is re-read on every call since the platform rotates it.
    pub fn get_token(&self, scope: &str) -> Result<String, BrokerError> {
        let assertion = fs::read_to_string(&self.token_file).map_err(|e| {
            BrokerError(format!(
                "failed to read federated token '{}': {}",
                self.token_file.display(),
                e
            ))
        })?;

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_assertion_type", JWT_BEARER_ASSERTION),
            ("client_assertion", assertion.trim()),
            ("scope", scope),
        ];
        request_token(&token_url(&self.authority_host, &self.tenant_id), &params)
    }
}

/// Managed identity token from the hosting platform
#[derive(Clone)]
pub struct ManagedIdentityCredential {
    endpoint: String,
    /// Secret header value; set only for App Service style endpoints
    identity_header: Option<String>,
    client_id: Option<String>,
}

impl std::fmt::Debug for ManagedIdentityCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedIdentityCredential")
            .field("endpoint", &self.endpoint)
            .field("app_service", &self.identity_header.is_some())
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl ManagedIdentityCredential {
    /// VM instance metadata service
    ///
    /// A user-assigned identity is picked with `AZURE_CLIENT_ID`.
    pub fn imds() -> Self {
        Self {
            endpoint: IMDS_ENDPOINT.to_string(),
            identity_header: None,
            client_id: std::env::var("AZURE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
        }
    }

    /// App Service / Functions endpoint from `IDENTITY_ENDPOINT` and
    /// `IDENTITY_HEADER`
    pub fn app_service_from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            endpoint: var("IDENTITY_ENDPOINT")?,
            identity_header: Some(var("IDENTITY_HEADER")?),
            client_id: var("AZURE_CLIENT_ID"),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_identity_header(mut self, header: impl Into<String>) -> Self {
        self.identity_header = Some(header.into());
        self
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    /// Request a token for `scope`
    pub fn get_token(&self, scope: &str) -> Result<String, BrokerError> {
        let resource = scope_to_resource(scope);
        let (api_version, header) = match self.identity_header {
            Some(ref secret) => ("2019-08-01", ("X-IDENTITY-HEADER", secret.as_str())),
            None => ("2018-02-01", ("Metadata", "true")),
        };
        debug!(endpoint = %self.endpoint, resource, "Requesting managed identity token");

        let mut query = vec![("api-version", api_version), ("resource", resource)];
        if let Some(ref client_id) = self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(IMDS_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BrokerError(format!("failed to build HTTP client: {}", e)))?;
        let response = client
            .get(&self.endpoint)
            .query(&query)
            .header(header.0, header.1)
            .send()
            .map_err(|e| BrokerError(format!("identity endpoint unreachable: {}", e)))?;

        read_token_response(response)
    }
}

/// Managed identity endpoints take a resource, not a `/.default` scope
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!("{}/{}/oauth2/v2.0/token", authority_host, tenant_id)
}

/// POST a form to an Azure AD token endpoint
fn request_token(url: &str, params: &[(&str, &str)]) -> Result<String, BrokerError> {
    debug!(url = %url, "Requesting token");

    let response = reqwest::blocking::Client::new()
        .post(url)
        .form(params)
        .send()
        .map_err(|e| BrokerError(format!("token request failed: {}", e)))?;

    read_token_response(response)
}

fn read_token_response(response: reqwest::blocking::Response) -> Result<String, BrokerError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| BrokerError(format!("failed to read token response: {}", e)))?;

    if !status.is_success() {
        return Err(BrokerError(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| BrokerError(format!("invalid token response: {}", e)))?;
    Ok(token.access_token)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureCliToken {
    access_token: String,
}

/// Ask the Azure CLI for a token from its cached session
fn azure_cli_token(program: &str, scope: &str) -> Result<String, BrokerError> {
    let output = Command::new(program)
        .args(["account", "get-access-token", "--scope", scope, "--output", "json"])
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BrokerError(format!("`{}` is not installed", program)),
            _ => BrokerError(format!("failed to run `{}`: {}", program, e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BrokerError(stderr.trim().to_string()));
    }

    parse_azure_cli_output(&output.stdout)
}

fn parse_azure_cli_output(stdout: &[u8]) -> Result<String, BrokerError> {
    let token: AzureCliToken = serde_json::from_slice(stdout)
        .map_err(|e| BrokerError(format!("unexpected `az` output: {}", e)))?;
    Ok(token.access_token)
}
