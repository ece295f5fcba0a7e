//! Wire messages for the bundle store API
//!
//! JSON bodies exchanged with `/push`, `/pull` and `/history`.

use serde::{Deserialize, Serialize};

use crate::models::{BundleId, EnvVarSet, VersionInfo};

/// Body of `POST /push`
#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub project: &'a str,
    pub service: &'a str,
    pub environment: &'a str,
    pub variables: &'a EnvVarSet,
    pub change_reason: &'a str,
}

impl<'a> PushRequest<'a> {
    pub fn new(bundle: &'a BundleId, variables: &'a EnvVarSet, change_reason: &'a str) -> Self {
        Self {
            project: &bundle.project,
            service: &bundle.service,
            environment: &bundle.environment,
            variables,
            change_reason,
        }
    }
}

/// Successful `/push` response
#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub version: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Successful `/history` response
///
/// A missing `history` field means no versions.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<VersionInfo>>,
}
