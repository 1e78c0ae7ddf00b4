//! Kubernetes access for the FuseML installer
//!
//! The installer never talks to the API server directly. Everything goes
//! through two narrow seams so orchestration logic can be tested with fakes:
//!
//! - [`Cluster`]: the handful of cluster queries and mutations the installer
//!   needs (namespaces, pods, secrets, services)
//! - [`CommandRunner`]: execution of external tools (`kubectl`, `helm`,
//!   `istioctl`, scripts), wrapped by [`Toolbox`]

pub mod cluster;
pub mod kubectl;
pub mod ownership;
pub mod pods;
pub mod runner;
pub mod toolbox;

use std::sync::Arc;

pub use cluster::{Capability, Cluster, PodStatus, SecretSpec};
pub use kubectl::KubectlCluster;
pub use runner::{CommandRunner, Invocation, ProcessRunner};
pub use toolbox::{ChartInstall, KubectlWait, Toolbox, UninstallOutcome};

/// Everything a deployment or extension needs to act on the cluster
#[derive(Clone)]
pub struct InstallContext {
    pub cluster: Arc<dyn Cluster>,
    pub tools: Toolbox,
}

impl InstallContext {
    pub fn new(cluster: Arc<dyn Cluster>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            cluster,
            tools: Toolbox::new(runner),
        }
    }

    /// Context backed by real `kubectl`/`helm` processes
    pub fn from_processes(kubeconfig: Option<String>) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(kubeconfig));
        let cluster: Arc<dyn Cluster> = Arc::new(KubectlCluster::new(runner.clone()));
        Self::new(cluster, runner)
    }
}
