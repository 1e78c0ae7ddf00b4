//! Components shipped as a helm chart in their own namespace

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use fuseml_kube::ownership::{delete_owned_namespace, label_namespace_owned};
use fuseml_kube::pods::{wait_for_pod_by_selector_running, wait_until_pod_by_selector_exists};
use fuseml_kube::{ChartInstall, InstallContext, UninstallOutcome};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// A helm release installed into a namespace of the same name
#[derive(Debug, Clone)]
pub struct ChartRelease {
    pub release: String,
    pub namespace: String,
    /// Chart archive path or URL
    pub chart: String,
    /// Rendered values file content
    pub values: String,
    /// Selects the pods that must be running once installed
    pub pod_selector: String,
    pub timeout: Duration,
}

impl ChartRelease {
    /// Install the release; returns `false` when it was already deployed
    pub async fn install(&self, ctx: &InstallContext) -> Result<bool> {
        if ctx
            .tools
            .helm_release_deployed(&self.release, Some(&self.namespace))
            .await?
        {
            warn!(
                "{} already present under {} namespace, skipping installation",
                self.release, self.namespace
            );
            return Ok(false);
        }
        self.apply(ctx, false).await?;
        Ok(true)
    }

    pub async fn upgrade(&self, ctx: &InstallContext) -> Result<()> {
        self.apply(ctx, true).await
    }

    /// Remove the release and its namespace
    pub async fn uninstall(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing helm release {}", self.release);
        let outcome = ctx
            .tools
            .uninstall_chart(&self.release, Some(&self.namespace))
            .await
            .with_context(|| format!("Failed uninstalling helm release {}", self.release))?;
        if outcome == UninstallOutcome::NotFound {
            warn!("{} helm release not found, skipping", self.release);
        }

        delete_owned_namespace(ctx.cluster.as_ref(), &self.namespace, self.timeout)
            .await
            .with_context(|| format!("Failed deleting namespace {}", self.namespace))?;
        Ok(())
    }

    async fn apply(&self, ctx: &InstallContext, upgrade: bool) -> Result<()> {
        let mut values = NamedTempFile::new().context("can't create temp file for helm values")?;
        values.write_all(self.values.as_bytes())?;
        let values_path = values.path().to_string_lossy().into_owned();

        let chart = ChartInstall::new(&self.release, &self.chart)
            .namespace(&self.namespace)
            .values(values_path)
            .upgrade(upgrade);
        ctx.tools
            .install_chart(&chart)
            .await
            .with_context(|| format!("Failed installing {}", self.release))?;

        label_namespace_owned(ctx.cluster.as_ref(), &self.namespace).await?;

        let cluster = ctx.cluster.as_ref();
        wait_until_pod_by_selector_exists(cluster, &self.namespace, &self.pod_selector, self.timeout)
            .await
            .with_context(|| format!("failed waiting for {} deployment to exist", self.release))?;
        wait_for_pod_by_selector_running(cluster, &self.namespace, &self.pod_selector, self.timeout)
            .await
            .with_context(|| format!("failed waiting for {} deployment to come up", self.release))?;
        Ok(())
    }
}
