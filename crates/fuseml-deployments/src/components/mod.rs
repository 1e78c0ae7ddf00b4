//! Platform components
//!
//! Each component owns one or more namespaces and carries its own
//! configuration struct, so nothing is read from process-wide state.

mod chart;
mod core_service;
mod gitea;
mod istio;
mod registry;
mod tekton;
mod workloads;

pub use chart::ChartRelease;
pub use core_service::{Core, CoreConfig, CORE_DEPLOYMENT_ID};
pub use gitea::{Gitea, GiteaConfig, GITEA_DEPLOYMENT_ID};
pub use istio::{Istio, IstioConfig, ISTIO_DEPLOYMENT_ID};
pub use registry::{Registry, RegistryConfig, REGISTRY_DEPLOYMENT_ID};
pub use tekton::{Tekton, TektonConfig, TEKTON_DEPLOYMENT_ID};
pub use workloads::{Workloads, WorkloadsConfig, GITEA_CREDS_SECRET, WORKLOADS_DEPLOYMENT_ID};

use anyhow::{bail, Context, Result};
use fuseml_core::options::InstallationOptions;
use fuseml_kube::ownership::namespace_exists_and_owned;
use fuseml_kube::InstallContext;
use tracing::warn;

use crate::options::SYSTEM_DOMAIN;

/// System domain as seen by one component
pub(crate) fn system_domain(options: &InstallationOptions, component: &str) -> Result<String> {
    options
        .get_string(SYSTEM_DOMAIN, component)
        .context("Couldn't get system_domain option")
}

/// Whether a component's namespace may be removed, warning when it may not
pub(crate) async fn owned_or_skip(
    ctx: &InstallContext,
    namespace: &str,
    component: &str,
) -> Result<bool> {
    let owned = namespace_exists_and_owned(ctx.cluster.as_ref(), namespace)
        .await
        .with_context(|| format!("failed to check if namespace '{}' is owned or not", namespace))?;
    if !owned {
        warn!(
            "Skipping {} removal because namespace {} either doesn't exist or not owned by FuseML",
            component, namespace
        );
    }
    Ok(owned)
}

/// Fail unless a component's namespace exists
pub(crate) async fn require_installed(
    ctx: &InstallContext,
    namespace: &str,
    component: &str,
) -> Result<()> {
    if !ctx.cluster.namespace_exists(namespace).await? {
        bail!(
            "{} is not installed: namespace {} not present",
            component,
            namespace
        );
    }
    Ok(())
}
