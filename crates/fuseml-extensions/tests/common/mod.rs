//! Common test utilities for fuseml-extensions

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fuseml_core::options::InstallationOptions;
use fuseml_deployments::options::{install_options, SYSTEM_DOMAIN};
use fuseml_extensions::Extension;
use fuseml_kube::{Cluster, CommandRunner, InstallContext};
use tempfile::TempDir;

pub const DOMAIN: &str = "10.0.0.1.nip.io";
pub const TIMEOUT: Duration = Duration::from_secs(300);

/// Context over the given fakes
pub fn context(cluster: &Arc<FakeCluster>, runner: &Arc<RecordingRunner>) -> InstallContext {
    let cluster: Arc<dyn Cluster> = cluster.clone();
    let runner: Arc<dyn CommandRunner> = runner.clone();
    InstallContext::new(cluster, runner)
}

/// Install options with `system_domain` already known
pub fn options_with_domain() -> InstallationOptions {
    let mut options = install_options("/srv/extensions").unwrap();
    options.set(SYSTEM_DOMAIN, None, DOMAIN).unwrap();
    options
}

/// Extension repository in a temporary directory
pub struct TestRepository {
    dir: TempDir,
}

impl TestRepository {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write `<repo>/<name>/description.yaml`
    pub fn describe(&self, name: &str, description: &str) -> &Self {
        self.file(name, "description.yaml", description)
    }

    /// Write `<repo>/<name>/<file>`
    pub fn file(&self, name: &str, file: &str, content: &str) -> &Self {
        let dir = self.dir.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), content).unwrap();
        self
    }

    pub fn location(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Path of a file inside an extension directory
    pub fn path(&self, name: &str, file: &str) -> PathBuf {
        self.dir.path().join(name).join(file)
    }

    pub async fn load(&self, name: &str) -> Extension {
        Extension::load(name, &self.location(), TIMEOUT).await.unwrap()
    }
}
