//! Sync client implementation
//!
//! Blocking HTTP client for the bundle store. Each operation is one
//! request; nothing is retried because a repeated push would create a
//! duplicate version.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use super::message::{HistoryResponse, PushRequest, PushResponse};
use crate::auth::AuthHeaders;
use crate::models::{Bundle, BundleId, EnvVarSet, VersionInfo};

/// Errors talking to the remote store
#[derive(Error, Debug)]
pub enum SyncError {
    /// The server answered with a non-200 status
    #[error("Error {status}: {body}")]
    Remote { status: u16, body: String },

    /// The request never got a response
    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    /// A 200 response whose body could not be decoded
    #[error("Invalid response from {endpoint}: {details}")]
    InvalidResponse {
        endpoint: &'static str,
        details: String,
    },
}

impl SyncError {
    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::Remote { status: 401, .. } | SyncError::Remote { status: 403, .. } => {
                Some("Check that you are logged in and have access to this bundle.")
            }
            SyncError::Transport(_) => {
                Some("Check the api_url in your configuration and your network connection.")
            }
            _ => None,
        }
    }
}

/// Network-level failure (connection refused, DNS, timeout)
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        // reqwest hides the interesting part (e.g. "Connection refused") in the source chain
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// HTTP method used by the store API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: AuthHeaders,
    /// JSON body
    pub body: Option<String>,
}

/// Status and raw body of a response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests to the store
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a blocking reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("envhub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

/// Result of a successful push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Version assigned by the store
    pub version: i64,
    /// Server note, e.g. when nothing changed
    pub message: Option<String>,
}

/// Client for the bundle store API
pub struct SyncClient<T: Transport = HttpTransport> {
    /// Base URL without trailing slash
    api_url: String,
    /// Headers from the credential provider
    headers: AuthHeaders,
    transport: T,
}

impl SyncClient<HttpTransport> {
    /// Create a client using HTTP
    pub fn new(api_url: &str, headers: AuthHeaders) -> Result<Self, SyncError> {
        Ok(Self::with_transport(api_url, headers, HttpTransport::new()?))
    }
}

impl<T: Transport> SyncClient<T> {
    /// Create a client over any transport
    pub fn with_transport(api_url: &str, headers: AuthHeaders, transport: T) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            headers: headers.with("Content-Type", "application/json"),
            transport,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Store `variables` as a new version of `bundle`
    pub fn push(
        &self,
        bundle: &BundleId,
        variables: &EnvVarSet,
        change_reason: &str,
    ) -> Result<PushOutcome, SyncError> {
        info!(%bundle, count = variables.len(), "Pushing variables");

        let body = serde_json::to_string(&PushRequest::new(bundle, variables, change_reason))
            .map_err(|e| SyncError::InvalidResponse {
                endpoint: "push",
                details: format!("failed to encode request: {}", e),
            })?;

        let response = self.send(Method::Post, "push", Vec::new(), Some(body))?;
        let decoded: PushResponse = decode("push", &response.body)?;

        info!(%bundle, version = decoded.version, "Push accepted");
        Ok(PushOutcome {
            version: decoded.version,
            message: decoded.message,
        })
    }

    /// Fetch one version of `bundle`, or the latest when `version` is `None`
    ///
    /// The version number is passed through as given.
    pub fn pull(&self, bundle: &BundleId, version: Option<i64>) -> Result<Bundle, SyncError> {
        info!(%bundle, ?version, "Pulling variables");

        let mut query = bundle.query_pairs();
        if let Some(v) = version {
            query.push(("version", v.to_string()));
        }

        let response = self.send(Method::Get, "pull", query, None)?;
        decode("pull", &response.body)
    }

    /// List version metadata of `bundle` in server order
    ///
    /// An absent history is returned as an empty list.
    pub fn history(&self, bundle: &BundleId) -> Result<Vec<VersionInfo>, SyncError> {
        info!(%bundle, "Fetching history");

        let response = self.send(Method::Get, "history", bundle.query_pairs(), None)?;
        let decoded: HistoryResponse = decode("history", &response.body)?;
        Ok(decoded.history.unwrap_or_default())
    }

    fn send(
        &self,
        method: Method,
        endpoint: &'static str,
        query: Vec<(&'static str, String)>,
        body: Option<String>,
    ) -> Result<HttpResponse, SyncError> {
        let request = HttpRequest {
            method,
            url: format!("{}/{}", self.api_url, endpoint),
            query,
            headers: self.headers.clone(),
            body,
        };
        debug!(url = %request.url, ?method, "Sending request");

        let response = self.transport.send(&request)?;
        debug!(status = response.status, "Received response");

        if response.status != 200 {
            return Err(SyncError::Remote {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

fn decode<D: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<D, SyncError> {
    serde_json::from_str(body).map_err(|e| SyncError::InvalidResponse {
        endpoint,
        details: e.to_string(),
    })
}
