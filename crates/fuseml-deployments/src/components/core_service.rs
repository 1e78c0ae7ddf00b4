//! FuseML core API service

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_core::{DEFAULT_TIMEOUT_SECS, WORKLOADS_NAMESPACE};
use fuseml_kube::ownership::{create_owned_namespace, delete_owned_namespace};
use fuseml_kube::pods::{wait_for_pod_by_selector_running, wait_until_pod_by_selector_exists};
use fuseml_kube::{InstallContext, SecretSpec};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::workloads::GITEA_CREDS_SECRET;
use super::{owned_or_skip, require_installed, system_domain};
use crate::assets::Templates;
use crate::deployment::Deployment;
use crate::gateway::{expose, Route};

pub const CORE_DEPLOYMENT_ID: &str = "fuseml-core";
const CORE_VERSION: &str = "0.1";
const CORE_SERVICE_NAME: &str = "fuseml-core";
const CORE_SERVICE_PORT: u16 = 80;
const CORE_SECRET_NAME: &str = "fuseml-core-gitea";
const CORE_MANIFEST_TEMPLATE: &str = "fuseml-core.yaml.tera";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub namespace: String,
    pub image: String,
    pub timeout: Duration,
    /// External gitea account; the installed gitea's credentials when unset
    pub gitea_username: Option<String>,
    pub gitea_password: Option<String>,
    /// External gitea URL; `<gitea_protocol>://gitea.<system_domain>` when unset
    pub gitea_url: Option<String>,
    pub gitea_protocol: String,
    /// Namespace holding the installed gitea's credentials
    pub workloads_namespace: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            namespace: CORE_DEPLOYMENT_ID.to_string(),
            image: format!("ghcr.io/fuseml/fuseml-core:{}", CORE_VERSION),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            gitea_username: None,
            gitea_password: None,
            gitea_url: None,
            gitea_protocol: "http".to_string(),
            workloads_namespace: WORKLOADS_NAMESPACE.to_string(),
        }
    }
}

impl CoreConfig {
    /// Defaults plus `GITEA_USERNAME`, `GITEA_PASSWORD` and `GITEA_URL`
    pub fn from_env() -> Self {
        Self {
            gitea_username: std::env::var("GITEA_USERNAME").ok(),
            gitea_password: std::env::var("GITEA_PASSWORD").ok(),
            gitea_url: std::env::var("GITEA_URL").ok(),
            ..Self::default()
        }
    }
}

pub struct Core {
    config: CoreConfig,
    /// Credentials of the installed gitea, fetched at most once
    gitea_secret: OnceCell<BTreeMap<String, String>>,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            gitea_secret: OnceCell::new(),
        }
    }

    async fn installed_gitea_value(&self, ctx: &InstallContext, key: &str) -> Result<String> {
        let secret = self
            .gitea_secret
            .get_or_try_init(|| async {
                let namespace = &self.config.workloads_namespace;
                debug!("Fetching {} from {}", GITEA_CREDS_SECRET, namespace);
                ctx.cluster.get_secret(namespace, GITEA_CREDS_SECRET).await
            })
            .await?;
        Ok(secret.get(key).cloned().unwrap_or_default())
    }

    async fn core_secret(&self, ctx: &InstallContext) -> Result<SecretSpec> {
        let username = match &self.config.gitea_username {
            Some(username) => username.clone(),
            None => self
                .installed_gitea_value(ctx, "username")
                .await
                .context(
                    "value for gitea user name (GITEA_USERNAME) was not provided neither found in installed gitea instance",
                )?,
        };
        let password = match &self.config.gitea_password {
            Some(password) => password.clone(),
            None => self
                .installed_gitea_value(ctx, "password")
                .await
                .context(
                    "value for gitea user password (GITEA_PASSWORD) was not provided neither found in installed gitea instance",
                )?,
        };

        Ok(SecretSpec {
            name: CORE_SECRET_NAME.to_string(),
            namespace: self.config.namespace.clone(),
            secret_type: "Opaque".to_string(),
            annotations: BTreeMap::new(),
            data: BTreeMap::from([
                ("GITEA_USERNAME".to_string(), username),
                ("GITEA_PASSWORD".to_string(), password),
            ]),
        })
    }

    fn render_manifest(&self, domain: &str) -> Result<String> {
        let gitea_url = self
            .config
            .gitea_url
            .clone()
            .unwrap_or_else(|| format!("{}://gitea.{}", self.config.gitea_protocol, domain));

        let mut ctx = tera::Context::new();
        ctx.insert("namespace", &self.config.namespace);
        ctx.insert("image", &self.config.image);
        ctx.insert("gitea_url", &gitea_url);
        ctx.insert("secret_name", CORE_SECRET_NAME);
        Templates::new()?.render(CORE_MANIFEST_TEMPLATE, &ctx)
    }

    /// Apply the deployment and wait for it to run
    async fn apply(&self, ctx: &InstallContext, domain: &str) -> Result<()> {
        let ns = self.config.namespace.as_str();
        ctx.tools
            .apply_content(&self.render_manifest(domain)?, Some(ns))
            .await
            .with_context(|| format!("Installing {} failed", CORE_MANIFEST_TEMPLATE))?;

        let selector = format!("app.kubernetes.io/name={}", CORE_DEPLOYMENT_ID);
        let cluster = ctx.cluster.as_ref();
        wait_until_pod_by_selector_exists(cluster, ns, &selector, self.config.timeout)
            .await
            .context("failed waiting fuseml-core deployment to exist")?;
        wait_for_pod_by_selector_running(cluster, ns, &selector, self.config.timeout)
            .await
            .context("failed waiting for fuseml-core deployment to come up")?;
        Ok(())
    }
}

#[async_trait]
impl Deployment for Core {
    fn id(&self) -> &str {
        CORE_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!("Core version: {}", CORE_VERSION)
    }

    fn version(&self) -> String {
        CORE_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let ns = self.config.namespace.as_str();
        if ctx.cluster.namespace_exists(ns).await? {
            warn!("Namespace {} already present, skipping installation", ns);
            return Ok(());
        }

        info!("Deploying Core...");
        let domain = system_domain(options, CORE_DEPLOYMENT_ID)?;
        create_owned_namespace(ctx.cluster.as_ref(), ns).await?;
        let secret = self.core_secret(ctx).await?;
        ctx.cluster
            .create_secret(&secret)
            .await
            .with_context(|| format!("Failed creating secret {}", CORE_SECRET_NAME))?;

        self.apply(ctx, &domain).await?;

        let route = Route::new(
            CORE_DEPLOYMENT_ID,
            ns,
            format!("{}.{}", CORE_DEPLOYMENT_ID, domain),
            CORE_SERVICE_NAME,
            CORE_SERVICE_PORT,
        );
        expose(ctx, &route).await?;

        info!("Core component deployed (http://{})", route.host);
        Ok(())
    }

    async fn upgrade(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let ns = self.config.namespace.as_str();
        require_installed(ctx, ns, "Core component").await?;

        info!("Upgrading Core...");
        let domain = system_domain(options, CORE_DEPLOYMENT_ID)?;
        let secret = self.core_secret(ctx).await?;
        ctx.cluster.delete_secret(ns, CORE_SECRET_NAME).await?;
        ctx.cluster
            .create_secret(&secret)
            .await
            .with_context(|| format!("Failed creating secret {}", CORE_SECRET_NAME))?;

        self.apply(ctx, &domain).await?;
        info!("Core component upgraded");
        Ok(())
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Core component...");
        let ns = self.config.namespace.as_str();
        if !owned_or_skip(ctx, ns, "Core component").await? {
            return Ok(());
        }

        // the gitea URL does not affect which objects are deleted
        ctx.tools
            .delete_content(&self.render_manifest("")?, Some(ns))
            .await
            .with_context(|| format!("Deleting {} failed", CORE_MANIFEST_TEMPLATE))?;
        ctx.cluster
            .delete_secret(ns, CORE_SECRET_NAME)
            .await
            .with_context(|| format!("Failed deleting secret {}", CORE_SECRET_NAME))?;
        delete_owned_namespace(ctx.cluster.as_ref(), ns, self.config.timeout)
            .await
            .with_context(|| format!("Failed deleting namespace {}", ns))?;

        info!("Core component removed");
        Ok(())
    }
}
