//! Local development identity
//!
//! Sends a fixed user header instead of a token. Only constructible for
//! loopback endpoints.

use super::{is_loopback, AuthError, AuthHeaders, CredentialProvider};

/// User id sent to loopback endpoints
pub const LOCAL_USER_ID: &str = "local-dev@aity.dev";

/// Placeholder identity for a locally running API
#[derive(Debug, Clone)]
pub struct LocalProvider {
    _private: (),
}

impl LocalProvider {
    /// Create the provider for `api_url`
    ///
    /// Returns `None` unless the URL is a loopback address.
    pub fn for_endpoint(api_url: &str) -> Option<Self> {
        is_loopback(api_url).then_some(Self { _private: () })
    }
}

impl CredentialProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn headers(&self) -> Result<AuthHeaders, AuthError> {
        Ok(AuthHeaders::default().with("x-user-id", LOCAL_USER_ID))
    }
}
