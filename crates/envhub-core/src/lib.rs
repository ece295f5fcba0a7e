//! envhub Core Library
//!
//! This crate provides the core functionality for envhub, a client for
//! versioned environment variable bundles stored behind an HTTP API.
//!
//! # Architecture
//!
//! A bundle is identified by project, service and environment. Every push
//! appends an immutable version; the store assigns version numbers.
//!
//! # Quick Start
//!
//! ```text
//! let config = ConfigStore::new(ConfigStore::default_path()).load()?;
//! let provider = auth::select_provider(&config);
//! let client = SyncClient::new(&config.api_url, provider.headers()?)?;
//!
//! let vars = envfile::read_file(Path::new(".env"))?;
//! let outcome = client.push(&BundleId::new("shop", "api", "dev"), &vars, "initial")?;
//! ```
//!
//! # Modules
//!
//! - `envfile`: `.env` parsing and serialization
//! - `models`: bundle identity, version metadata, variable sets
//! - `config`: persisted client configuration
//! - `auth`: credential providers (local, Azure AD, GitHub CLI)
//! - `sync`: push/pull/history client

pub mod auth;
pub mod config;
pub mod envfile;
pub mod models;
pub mod sync;

pub use auth::{select_provider, AuthError, AuthHeaders, CredentialProvider};
pub use config::{ConfigError, ConfigStore, IdentityBackend, LocalConfig};
pub use envfile::EnvFileError;
pub use models::{Bundle, BundleId, EnvVarSet, VersionInfo};
pub use sync::{PushOutcome, SyncClient, SyncError};
