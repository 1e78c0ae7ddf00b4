//! Common test utilities for fuseml-deployments

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use fuseml_core::options::InstallationOptions;
use fuseml_deployments::options::{install_options, SYSTEM_DOMAIN};
use fuseml_kube::{Cluster, CommandRunner, InstallContext};

pub const DOMAIN: &str = "10.0.0.1.nip.io";

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
