//! Data models for envhub
//!
//! Defines the core data structures: bundle identity, version metadata
//! and the ordered variable set that travels between `.env` files and
//! the remote store.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered mapping of variable name to value
///
/// Iteration follows insertion order, so serializing a parsed file keeps
/// the original line order.
pub type EnvVarSet = IndexMap<String, String>;

/// Identity of one append-only version sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId {
    pub project: String,
    pub service: String,
    pub environment: String,
}

impl BundleId {
    /// Create a bundle identity from its three parts
    pub fn new(
        project: impl Into<String>,
        service: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            service: service.into(),
            environment: environment.into(),
        }
    }

    /// Query parameters addressing this bundle on the remote store
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("project", self.project.clone()),
            ("service", self.service.clone()),
            ("environment", self.environment.clone()),
        ]
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.service, self.environment)
    }
}

/// Metadata of one stored version (no variable values)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version number assigned by the remote store
    pub version: i64,
    /// Creation timestamp as reported by the server
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    /// Identity that pushed this version
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    /// Reason given at push time
    #[serde(default, deserialize_with = "null_as_default")]
    pub change_reason: String,
}

/// Read a JSON `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl VersionInfo {
    /// Creation time rendered in local time
    ///
    /// Falls back to the raw server string when it is not RFC 3339.
    pub fn created_at_display(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.created_at) {
            Ok(ts) => ts
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            Err(_) => self.created_at.clone(),
        }
    }
}

/// A resolved version as returned by a pull
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub change_reason: Option<String>,
    /// Variables of this version
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: EnvVarSet,
}
