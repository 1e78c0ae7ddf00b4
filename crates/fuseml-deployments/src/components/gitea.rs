//! Source control server (gitea)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_core::DEFAULT_TIMEOUT_SECS;
use fuseml_kube::InstallContext;
use tracing::info;

use super::chart::ChartRelease;
use super::{owned_or_skip, require_installed, system_domain};
use crate::assets::Templates;
use crate::deployment::Deployment;
use crate::gateway::{expose, Route};

pub const GITEA_DEPLOYMENT_ID: &str = "gitea";
const GITEA_VERSION: &str = "4.1.1";
const GITEA_HTTP_SERVICE: &str = "gitea-http";
const GITEA_HTTP_PORT: u16 = 10080;

/// Credentials of the initial gitea admin, shared with pipelines
pub const GITEA_DEFAULT_USERNAME: &str = "dev";
pub const GITEA_DEFAULT_PASSWORD: &str = "changeme";

#[derive(Debug, Clone)]
pub struct GiteaConfig {
    pub namespace: String,
    pub chart: String,
    pub timeout: Duration,
}

impl Default for GiteaConfig {
    fn default() -> Self {
        Self {
            namespace: GITEA_DEPLOYMENT_ID.to_string(),
            chart: format!("https://dl.gitea.io/charts/gitea-{}.tgz", GITEA_VERSION),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct Gitea {
    config: GiteaConfig,
}

impl Gitea {
    pub fn new(config: GiteaConfig) -> Self {
        Self { config }
    }

    fn host(domain: &str) -> String {
        format!("{}.{}", GITEA_DEPLOYMENT_ID, domain)
    }

    fn release(&self, domain: &str) -> Result<ChartRelease> {
        let mut ctx = tera::Context::new();
        ctx.insert("host", &Self::host(domain));
        ctx.insert("username", GITEA_DEFAULT_USERNAME);
        ctx.insert("password", GITEA_DEFAULT_PASSWORD);

        Ok(ChartRelease {
            release: GITEA_DEPLOYMENT_ID.to_string(),
            namespace: self.config.namespace.clone(),
            chart: self.config.chart.clone(),
            values: Templates::new()?.render("gitea-values.yaml.tera", &ctx)?,
            pod_selector: "app.kubernetes.io/name=gitea".to_string(),
            timeout: self.config.timeout,
        })
    }
}

#[async_trait]
impl Deployment for Gitea {
    fn id(&self) -> &str {
        GITEA_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!("Gitea version: {}", GITEA_VERSION)
    }

    fn version(&self) -> String {
        GITEA_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let domain = system_domain(options, GITEA_DEPLOYMENT_ID)?;

        info!("Deploying Gitea...");
        if !self.release(&domain)?.install(ctx).await? {
            return Ok(());
        }

        let route = Route::new(
            GITEA_DEPLOYMENT_ID,
            &self.config.namespace,
            Self::host(&domain),
            GITEA_HTTP_SERVICE,
            GITEA_HTTP_PORT,
        );
        expose(ctx, &route).await?;

        info!("Gitea deployed (http://{})", route.host);
        Ok(())
    }

    async fn upgrade(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        require_installed(ctx, &self.config.namespace, "Gitea").await?;
        let domain = system_domain(options, GITEA_DEPLOYMENT_ID)?;

        info!("Upgrading Gitea...");
        self.release(&domain)?.upgrade(ctx).await?;
        info!("Gitea upgraded");
        Ok(())
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Gitea...");
        if !owned_or_skip(ctx, &self.config.namespace, "Gitea").await? {
            return Ok(());
        }
        // values do not matter for removal
        self.release("")?.uninstall(ctx).await?;
        info!("Gitea removed");
        Ok(())
    }
}
