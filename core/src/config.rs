//! Application configuration.
//!
//! Read from `config.json` in the storage root. Every field has a default, so a
//! missing file or a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::DEFAULT_PBKDF2_ITERATIONS;
use crate::store::CollectionPath;

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_APP_ID: &str = "young-ats";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub app_id: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub identity: IdentityConfig,
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            log_level: "info".to_string(),
            log_file: None,
            identity: IdentityConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityConfig {
    /// E-mail domains allowed to sign in. Empty allows every domain.
    pub allowed_domains: Vec<String>,
    pub pbkdf2_iterations: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Encrypts the candidate collection at rest when set.
    pub passphrase: Option<String>,
    /// Inserts the sample candidates into an empty collection on startup.
    pub seed_demo: bool,
}

impl AppConfig {
    /// Loads `config.json` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or validated.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let app_id = self.app_id.trim();
        if app_id.is_empty() {
            return Err(ConfigError::Validation("app_id is required".to_string()));
        }
        if app_id.contains('/') || app_id == "." || app_id == ".." {
            return Err(ConfigError::Validation(format!(
                "app_id must be a single path segment, got {app_id:?}"
            )));
        }
        if self.store.passphrase.as_deref() == Some("") {
            return Err(ConfigError::Validation(
                "store.passphrase must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn candidates_path(&self) -> CollectionPath {
        CollectionPath::candidates(self.app_id.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.candidates_path().as_str(),
            "artifacts/young-ats/public/data/candidates"
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_json(
            r#"{ "app_id": "talentos", "identity": { "allowed_domains": ["young.com.br"] } }"#,
        )
        .unwrap();
        assert_eq!(config.app_id, "talentos");
        assert_eq!(config.identity.allowed_domains, ["young.com.br"]);
        assert_eq!(config.identity.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
        assert_eq!(config.log_level, "info");
        assert!(!config.store.seed_demo);
    }

    #[test]
    fn rejects_nested_app_id() {
        let err = AppConfig::from_json(r#"{ "app_id": "a/b" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
