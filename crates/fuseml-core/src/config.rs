//! Local CLI configuration
//!
//! Stored at `~/.config/fuseml/config.yaml`. Every key can be overridden
//! with a `FUSEML_<KEY>` environment variable.

use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::{DEFAULT_TIMEOUT_SECS, WORKLOADS_NAMESPACE};

/// Repository searched for extension descriptions when none is given
pub const DEFAULT_EXTENSIONS_REPOSITORY: &str =
    "https://raw.githubusercontent.com/fuseml/extensions/release-0.2/installer/";

const ENV_PREFIX: &str = "FUSEML_";

/// Persisted CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusemlConfig {
    /// Protocol used to reach the source-control server
    pub gitea_protocol: String,
    /// Namespace for workloads
    pub workloads_namespace: String,
    /// Domain under which platform services are exposed
    pub system_domain: String,
    /// Default repository for extension descriptions
    pub extensions_repository: String,
    /// Kubeconfig passed to every tool; empty uses the tools' own default
    pub kubeconfig: String,
    /// Seconds an extension step may wait for its resources
    pub extension_timeout: u64,
}

impl Default for FusemlConfig {
    fn default() -> Self {
        Self {
            gitea_protocol: "http".to_string(),
            workloads_namespace: WORKLOADS_NAMESPACE.to_string(),
            system_domain: String::new(),
            extensions_repository: DEFAULT_EXTENSIONS_REPOSITORY.to_string(),
            kubeconfig: String::new(),
            extension_timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FusemlConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<Utf8PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .map(std::path::PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or_else(|| Error::config("could not determine home directory"))?;
        let path = home.join(".config").join("fuseml").join("config.yaml");
        Utf8PathBuf::from_path_buf(path)
            .map_err(|p| Error::config(format!("non UTF-8 config path: {}", p.display())))
    }

    /// Load the config from `path` (or the default location)
    ///
    /// A missing file yields the defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_owned(),
            None => Self::default_path()?,
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Loading config from {}", path);
                serde_yaml_ng::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path);
                Self::default()
            }
            Err(e) => return Err(Error::Io(e)),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Write the config to `path` (or the default location)
    pub fn save(&self, path: Option<&Utf8Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_owned(),
            None => Self::default_path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_yaml_ng::to_string(self)?)?;
        debug!("Saved config to {}", path);
        Ok(())
    }

    /// Kubeconfig path, if one is configured
    pub fn kubeconfig_path(&self) -> Option<String> {
        Some(self.kubeconfig.clone()).filter(|k| !k.is_empty())
    }

    /// Wait limit for extension steps
    pub fn extension_timeout(&self) -> Duration {
        Duration::from_secs(self.extension_timeout)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        let fields: [(&str, &mut String); 5] = [
            ("GITEA_PROTOCOL", &mut self.gitea_protocol),
            ("WORKLOADS_NAMESPACE", &mut self.workloads_namespace),
            ("SYSTEM_DOMAIN", &mut self.system_domain),
            ("EXTENSIONS_REPOSITORY", &mut self.extensions_repository),
            ("KUBECONFIG", &mut self.kubeconfig),
        ];
        for (key, field) in fields {
            if let Ok(value) = std::env::var(format!("{}{}", ENV_PREFIX, key)) {
                *field = value;
            }
        }

        let key = format!("{}EXTENSION_TIMEOUT", ENV_PREFIX);
        if let Ok(value) = std::env::var(&key) {
            self.extension_timeout = value.trim().parse().map_err(|_| {
                Error::config(format!("{} must be a number of seconds, got '{}'", key, value))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn config_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("fuseml").join("config.yaml")).unwrap()
    }

    #[test]
    #[serial]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = FusemlConfig::load(Some(&config_path(&dir))).unwrap();
        assert_eq!(config, FusemlConfig::default());
        assert_eq!(config.workloads_namespace, "fuseml-workloads");
    }

    #[test]
    #[serial]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);

        let config = FusemlConfig {
            workloads_namespace: "ml-workloads".to_string(),
            extension_timeout: 900,
            system_domain: "10.0.0.1.nip.io".to_string(),
            ..Default::default()
        };
        config.save(Some(&path)).unwrap();

        let loaded = FusemlConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "gitea_protocol: https\n").unwrap();

        let config = FusemlConfig::load(Some(&path)).unwrap();
        assert_eq!(config.gitea_protocol, "https");
        assert_eq!(config.workloads_namespace, "fuseml-workloads");
        assert_eq!(config.extension_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "workloads_namespace: research\nextension_timeout: 60\n").unwrap();

        std::env::set_var("FUSEML_WORKLOADS_NAMESPACE", "override");
        std::env::set_var("FUSEML_EXTENSION_TIMEOUT", "1200");
        let config = FusemlConfig::load(Some(&path));
        std::env::remove_var("FUSEML_WORKLOADS_NAMESPACE");
        std::env::remove_var("FUSEML_EXTENSION_TIMEOUT");

        let config = config.unwrap();
        assert_eq!(config.workloads_namespace, "override");
        assert_eq!(config.extension_timeout(), Duration::from_secs(1200));
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_override_is_an_error() {
        let dir = TempDir::new().unwrap();

        std::env::set_var("FUSEML_EXTENSION_TIMEOUT", "5m");
        let result = FusemlConfig::load(Some(&config_path(&dir)));
        std::env::remove_var("FUSEML_EXTENSION_TIMEOUT");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("FUSEML_EXTENSION_TIMEOUT"));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "system_domain: [unclosed\n").unwrap();

        assert!(FusemlConfig::load(Some(&path)).is_err());
    }
}
