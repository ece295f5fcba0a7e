//! Local client configuration
//!
//! The configuration is a small JSON record holding the remote API base URL
//! and the identity settings. It is written by `envhub init` and read by
//! every other command.
//!
//! Values are taken from:
//! 1. The config file (path injected into [`ConfigStore`])
//! 2. Environment variables (ENVHUB_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix
const ENV_PREFIX: &str = "ENVHUB";

/// Directory under the home directory holding the config file
const CONFIG_DIR_NAME: &str = ".envecl";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Default remote API for the Azure AD deployment
pub const DEFAULT_API_URL: &str = "https://envecl.azurewebsites.net/api";

/// Errors loading or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No config file at the expected path
    #[error("Not configured: no config file at '{path}'")]
    NotConfigured { path: PathBuf },

    /// Config file exists but cannot be read as a configuration
    #[error("Config file '{path}' is corrupted: {details}")]
    CorruptConfig { path: PathBuf, details: String },

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ConfigError::NotConfigured { .. } => Some("Run `envhub init` first."),
            ConfigError::CorruptConfig { .. } => {
                Some("Re-run `envhub init` to rewrite the configuration.")
            }
            ConfigError::Write { .. } => {
                Some("Check that the config directory exists and is writable.")
            }
        }
    }
}

/// Identity backend used to authenticate against the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityBackend {
    /// Azure AD tokens from the platform identity broker
    #[default]
    AzureAd,
    /// Tokens issued by the GitHub CLI (`gh`)
    GithubCli,
}

impl IdentityBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityBackend::AzureAd => "azure-ad",
            IdentityBackend::GithubCli => "github-cli",
        }
    }
}

impl std::fmt::Display for IdentityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdentityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azure-ad" | "azure" => Ok(IdentityBackend::AzureAd),
            "github-cli" | "github" | "gh" => Ok(IdentityBackend::GithubCli),
            other => Err(format!(
                "unknown identity backend '{}' (expected azure-ad or github-cli)",
                other
            )),
        }
    }
}

/// Persisted client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Base URL of the remote API, without trailing slash
    pub api_url: String,

    /// Audience/scope requested from the identity broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Which identity backend issues bearer tokens
    #[serde(default)]
    pub backend: IdentityBackend,
}

impl LocalConfig {
    /// Create a configuration, normalizing the API URL
    pub fn new(api_url: &str, scope: Option<String>, backend: IdentityBackend) -> Self {
        Self {
            api_url: normalize_api_url(api_url),
            scope: scope.filter(|s| !s.is_empty()),
            backend,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // ENVHUB_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = normalize_api_url(&val);
            }
        }

        // ENVHUB_SCOPE
        if let Ok(val) = std::env::var(format!("{}_SCOPE", ENV_PREFIX)) {
            self.scope = if val.is_empty() { None } else { Some(val) };
        }
    }
}

/// Strip trailing slashes so endpoint paths can be appended directly
fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Loads and saves [`LocalConfig`] at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store reading and writing `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the default config file path
    ///
    /// Can be overridden with ENVHUB_CONFIG environment variable
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a config file is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the configuration
    ///
    /// Environment variables are applied as overrides.
    pub fn load(&self) -> Result<LocalConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotConfigured {
                    path: self.path.clone(),
                });
            }
            Err(e) => {
                return Err(ConfigError::CorruptConfig {
                    path: self.path.clone(),
                    details: e.to_string(),
                });
            }
        };

        let mut config: LocalConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::CorruptConfig {
                path: self.path.clone(),
                details: e.to_string(),
            })?;
        config.api_url = normalize_api_url(&config.api_url);

        config.apply_env_overrides();
        debug!(path = %self.path.display(), backend = %config.backend, "Loaded configuration");
        Ok(config)
    }

    /// Save the configuration
    ///
    /// Creates the containing directory if needed. The file is written to a
    /// temporary sibling first and renamed into place.
    pub fn save(&self, config: &LocalConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::Write {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|e| ConfigError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ConfigError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &["ENVHUB_API_URL", "ENVHUB_SCOPE", "ENVHUB_CONFIG"];

    fn store_in(temp_dir: &TempDir) -> ConfigStore {
        ConfigStore::new(temp_dir.path().join("nested").join("config.json"))
    }

    #[test]
    fn test_load_missing_is_not_configured() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let err = store.load().unwrap_err();
        assert!(matches!(err, ConfigError::NotConfigured { .. }));
        assert_eq!(err.recovery_suggestion(), Some("Run `envhub init` first."));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::CorruptConfig { .. }));
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn test_load_wrong_shape_is_corrupt() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"scope": "api://x/.default"}"#).unwrap();

        let err = ConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::CorruptConfig { .. }));
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let config = LocalConfig::new(
            "https://example.com/api/",
            Some("api://client-id/.default".to_string()),
            IdentityBackend::AzureAd,
        );
        store.save(&config).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.api_url, "https://example.com/api");

        // Saving again overwrites in place
        let updated =
            LocalConfig::new("http://localhost:3000/api", None, IdentityBackend::GithubCli);
        store.save(&updated).unwrap();
        assert_eq!(store.load().unwrap(), updated);
    }

    #[test]
    fn test_backend_defaults_to_azure() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"api_url": "https://example.com/api", "scope": "api://x/.default"}"#,
        )
        .unwrap();

        let config = ConfigStore::new(&path).load().unwrap();
        assert_eq!(config.backend, IdentityBackend::AzureAd);
        assert_eq!(config.scope.as_deref(), Some("api://x/.default"));
    }

    #[test]
    fn test_serialization_format() {
        let config = LocalConfig::new("https://example.com", None, IdentityBackend::GithubCli);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""backend":"github-cli""#));
        assert!(!json.contains("scope"));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store
            .save(&LocalConfig::new(
                "https://example.com/api",
                Some("api://x/.default".to_string()),
                IdentityBackend::AzureAd,
            ))
            .unwrap();

        env::set_var("ENVHUB_API_URL", "http://127.0.0.1:8080/api/");
        let config = store.load().unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:8080/api");

        // Empty string clears the scope
        env::set_var("ENVHUB_SCOPE", "");
        let config = store.load().unwrap();
        assert!(config.scope.is_none());
    }

    #[test]
    fn test_default_path() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = ConfigStore::default_path();
        assert!(path.ends_with(".envecl/config.json"));

        env::set_var("ENVHUB_CONFIG", "/tmp/envhub-test/config.json");
        assert_eq!(
            ConfigStore::default_path(),
            PathBuf::from("/tmp/envhub-test/config.json")
        );
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(
            "azure-ad".parse::<IdentityBackend>(),
            Ok(IdentityBackend::AzureAd)
        );
        assert_eq!(
            "gh".parse::<IdentityBackend>(),
            Ok(IdentityBackend::GithubCli)
        );
        assert!("okta".parse::<IdentityBackend>().is_err());
    }
}
