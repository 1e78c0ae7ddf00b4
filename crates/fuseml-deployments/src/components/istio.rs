//! Service mesh (istio)

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_core::DEFAULT_TIMEOUT_SECS;
use fuseml_kube::ownership::{delete_owned_namespace, ownership_labels};
use fuseml_kube::pods::{wait_for_pod_by_selector_running, wait_until_pod_by_selector_exists};
use fuseml_kube::{Capability, InstallContext};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::owned_or_skip;
use crate::assets;
use crate::deployment::Deployment;

pub const ISTIO_DEPLOYMENT_ID: &str = "istio";
const ISTIO_VERSION: &str = "1.11.4";
const ISTIO_OPERATOR_MANIFEST: &str = "istio/istio-minimal-operator.yaml";
const ISTIOD_SELECTOR: &str = "app=istiod";

#[derive(Debug, Clone)]
pub struct IstioConfig {
    pub namespace: String,
    pub timeout: Duration,
}

impl Default for IstioConfig {
    fn default() -> Self {
        Self {
            namespace: "istio-system".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct Istio {
    config: IstioConfig,
}

impl Istio {
    pub fn new(config: IstioConfig) -> Self {
        Self { config }
    }

    /// Operator manifest written to disk, as `istioctl` only reads files
    fn operator_file() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new().context("can't create temp file")?;
        file.write_all(assets::manifest(ISTIO_OPERATOR_MANIFEST)?.as_bytes())?;
        Ok(file)
    }

    async fn create_namespace(&self, ctx: &InstallContext) -> Result<()> {
        if ctx.cluster.namespace_exists(&self.config.namespace).await? {
            return Ok(());
        }
        let mut labels = ownership_labels();
        labels.insert("istio-injection".to_string(), "disabled".to_string());
        ctx.cluster
            .create_namespace(&self.config.namespace, &labels)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Deployment for Istio {
    fn id(&self) -> &str {
        ISTIO_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!("Istio version: {}", ISTIO_VERSION)
    }

    fn version(&self) -> String {
        ISTIO_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        if ctx.cluster.has_capability(Capability::Istio).await? {
            warn!("Istio already installed, skipping ...");
            return Ok(());
        }
        if ctx.cluster.has_capability(Capability::Traefik).await? {
            warn!("Traefik Ingress already installed, not installing Istio");
            return Ok(());
        }

        info!("Deploying Istio...");
        self.create_namespace(ctx)
            .await
            .context("Failed creating namespace for istio component")?;

        let operator = Self::operator_file()?;
        let path = operator.path().to_string_lossy().into_owned();
        ctx.tools
            .istioctl(["manifest", "install", "-y", "-f", path.as_str()])
            .await
            .context("Failed installing istio")?;

        let cluster = ctx.cluster.as_ref();
        let ns = self.config.namespace.as_str();
        wait_until_pod_by_selector_exists(cluster, ns, ISTIOD_SELECTOR, self.config.timeout)
            .await
            .context("failed waiting for Istio deployment to exist")?;
        wait_for_pod_by_selector_running(cluster, ns, ISTIOD_SELECTOR, self.config.timeout)
            .await
            .context("failed waiting for Istio deployment to come up")?;

        info!("Istio deployed");
        Ok(())
    }

    async fn upgrade(&self, _ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        info!("Istio upgrade not supported, skipping");
        Ok(())
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Istio...");
        if !owned_or_skip(ctx, &self.config.namespace, "istio").await? {
            return Ok(());
        }

        let operator = Self::operator_file()?;
        let path = operator.path().to_string_lossy().into_owned();
        let generated = ctx
            .tools
            .istioctl(["manifest", "generate", "-f", path.as_str()])
            .await
            .context("Failed generating istio manifest")?;
        ctx.tools
            .delete_content(&generated, None)
            .await
            .context("Failed uninstalling istio")?;

        delete_owned_namespace(ctx.cluster.as_ref(), &self.config.namespace, self.config.timeout)
            .await
            .with_context(|| format!("Failed deleting namespace {}", self.config.namespace))?;

        info!("Istio removed");
        Ok(())
    }
}
