//! Application configuration
//!
//! Loaded from an optional JSON file; every field has a default. The data
//! directory and HTTP address can be overridden from the environment.

use std::path::{Path, PathBuf};

use quorum_compliance::ComplianceConfig;
use serde::{Deserialize, Serialize};

pub const ENV_DATA_DIR: &str = "QUORUM_DATA_DIR";
pub const ENV_HTTP_ADDR: &str = "QUORUM_HTTP_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the stores, audit log and journal
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Screen every transaction proposal through the compliance engine
    #[serde(default)]
    pub screening: bool,

    /// JSON array of identity records; an empty directory is used if unset
    #[serde(default)]
    pub identities_file: Option<PathBuf>,

    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Bind address for `serve-http`
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_http_addr() -> String {
    "127.0.0.1:8700".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            screening: false,
            identities_file: None,
            compliance: ComplianceConfig::default(),
            http_addr: default_http_addr(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.compliance.validate()?;
        Ok(config)
    }

    /// Apply `QUORUM_DATA_DIR` / `QUORUM_HTTP_ADDR` if set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_DATA_DIR).ok(),
            std::env::var(ENV_HTTP_ADDR).ok(),
        )
    }

    fn with_overrides(mut self, data_dir: Option<String>, http_addr: Option<String>) -> Self {
        if let Some(dir) = data_dir.filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = http_addr.filter(|a| !a.is_empty()) {
            self.http_addr = addr;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quorum.json");
        std::fs::write(&path, "{}").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!config.screening);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quorum.json");
        std::fs::write(
            &path,
            r#"{"screening": true, "compliance": {"velocity_weight": 25}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert!(config.screening);
        assert_eq!(config.compliance.velocity_weight, 25);
        assert_eq!(config.http_addr, "127.0.0.1:8700");
    }

    #[test]
    fn test_invalid_compliance_config_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quorum.json");
        std::fs::write(&path, r#"{"compliance": {"velocity_window_secs": 0}}"#).unwrap();

        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default().with_overrides(Some("/var/lib/quorum".to_string()), Some(String::new()));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/quorum"));
        assert_eq!(config.http_addr, "127.0.0.1:8700");
    }
}
