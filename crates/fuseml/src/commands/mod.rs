//! CLI command implementations

pub mod completion;
pub mod extensions;
pub mod info;
pub mod install;
pub mod uninstall;
pub mod upgrade;
pub mod version;

use std::time::Duration;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fuseml_core::config::FusemlConfig;
use fuseml_core::options::InstallationOptions;
use fuseml_deployments::options::SYSTEM_DOMAIN;
use fuseml_extensions::RepositoryLoader;
use fuseml_kube::InstallContext;
use tracing::debug;

/// Loaded config plus the cluster it points at
pub struct Session {
    pub config: FusemlConfig,
    config_path: Option<Utf8PathBuf>,
    pub ctx: InstallContext,
}

impl Session {
    /// Load the config and build a context over `kubectl` and `helm`
    ///
    /// `kubeconfig` from the command line wins over the configured one.
    pub fn open(config_path: Option<&Utf8Path>, kubeconfig: Option<String>) -> Result<Self> {
        let config = FusemlConfig::load(config_path).context("Failed to load FuseML config")?;
        let kubeconfig = kubeconfig.or_else(|| config.kubeconfig_path());
        debug!("Using kubeconfig {}", kubeconfig.as_deref().unwrap_or("(default)"));

        Ok(Self {
            ctx: InstallContext::from_processes(kubeconfig),
            config_path: config_path.map(Utf8Path::to_owned),
            config,
        })
    }

    /// Timeout applied to extension steps
    pub fn timeout(&self) -> Duration {
        self.config.extension_timeout()
    }

    /// Loader for `repository` using the configured timeout and workloads namespace
    pub fn extension_loader(&self, repository: &str) -> RepositoryLoader {
        RepositoryLoader::new(repository, self.timeout())
            .with_workloads_namespace(&self.config.workloads_namespace)
    }

    /// Use the configured domain when none was given
    pub fn fill_domain(&self, options: &mut InstallationOptions) -> Result<()> {
        let given = options.get_string(SYSTEM_DOMAIN, "")?;
        if given.is_empty() && !self.config.system_domain.is_empty() {
            debug!("Using system domain {} from config", self.config.system_domain);
            options.set(SYSTEM_DOMAIN, None, self.config.system_domain.as_str())?;
        }
        Ok(())
    }

    /// Store the domain in the config file if it changed
    pub fn remember_domain(&mut self, domain: &str) -> Result<()> {
        if self.config.system_domain == domain {
            return Ok(());
        }
        self.config.system_domain = domain.to_string();
        self.config
            .save(self.config_path.as_deref())
            .context("Failed to save FuseML config")
    }
}

/// Session over a config file holding `config`
#[cfg(test)]
pub(crate) fn session_with(config: &str) -> (tempfile::TempDir, Session) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("config.yaml")).unwrap();
    std::fs::write(&path, config).unwrap();
    let session = Session::open(Some(&path), None).unwrap();
    (dir, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_timeout_comes_from_config() {
        let (_dir, session) = session_with("extension_timeout: 45\n");
        assert_eq!(session.timeout(), Duration::from_secs(45));
    }

    #[test]
    #[serial]
    fn test_fill_domain_uses_configured_domain() {
        let (_dir, session) = session_with("system_domain: 10.0.0.1.nip.io\n");
        let mut options = fuseml_deployments::options::upgrade_options().unwrap();

        session.fill_domain(&mut options).unwrap();

        assert_eq!(
            options.get_string(SYSTEM_DOMAIN, "").unwrap(),
            "10.0.0.1.nip.io"
        );
    }
}
