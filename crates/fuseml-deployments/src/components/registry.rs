//! Container registry (trow)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_kube::InstallContext;
use tracing::info;

use super::chart::ChartRelease;
use super::{owned_or_skip, require_installed};
use crate::assets::Templates;
use crate::deployment::Deployment;

pub const REGISTRY_DEPLOYMENT_ID: &str = "fuseml-registry";
const REGISTRY_VERSION: &str = "0.3.2";

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub namespace: String,
    pub chart: String,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: REGISTRY_DEPLOYMENT_ID.to_string(),
            chart: format!(
                "https://github.com/ContainerSolutions/trow/releases/download/v{v}/trow-{v}.tgz",
                v = REGISTRY_VERSION
            ),
            timeout: Duration::from_secs(180),
        }
    }
}

pub struct Registry {
    config: RegistryConfig,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    fn release(&self) -> Result<ChartRelease> {
        let mut ctx = tera::Context::new();
        ctx.insert("namespace", &self.config.namespace);

        Ok(ChartRelease {
            release: REGISTRY_DEPLOYMENT_ID.to_string(),
            namespace: self.config.namespace.clone(),
            chart: self.config.chart.clone(),
            values: Templates::new()?.render("registry-values.yaml.tera", &ctx)?,
            pod_selector: "app.kubernetes.io/name=trow".to_string(),
            timeout: self.config.timeout,
        })
    }
}

#[async_trait]
impl Deployment for Registry {
    fn id(&self) -> &str {
        REGISTRY_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!(
            "Registry version: {}, chart: {}",
            REGISTRY_VERSION, self.config.chart
        )
    }

    fn version(&self) -> String {
        REGISTRY_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        info!("Deploying Registry...");
        if self.release()?.install(ctx).await? {
            info!("Registry deployed");
        }
        Ok(())
    }

    async fn upgrade(&self, ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        require_installed(ctx, &self.config.namespace, "Registry").await?;
        info!("Upgrading Registry...");
        self.release()?.upgrade(ctx).await?;
        info!("Registry upgraded");
        Ok(())
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Registry...");
        if !owned_or_skip(ctx, &self.config.namespace, "Registry").await? {
            return Ok(());
        }
        self.release()?.uninstall(ctx).await?;
        info!("Registry removed");
        Ok(())
    }
}
