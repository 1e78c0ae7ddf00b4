//! Workloads namespace shared by pipelines and served models

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_core::{DEFAULT_TIMEOUT_SECS, WORKLOADS_NAMESPACE};
use fuseml_kube::ownership::{create_owned_namespace, delete_owned_namespace, label_namespace_owned};
use fuseml_kube::pods::wait_until_pod_by_selector_exists;
use fuseml_kube::{Capability, InstallContext, SecretSpec};
use tracing::{info, warn};

use super::gitea::{GITEA_DEFAULT_PASSWORD, GITEA_DEFAULT_USERNAME, GITEA_DEPLOYMENT_ID};
use super::{owned_or_skip, system_domain};
use crate::assets;
use crate::deployment::Deployment;

pub const WORKLOADS_DEPLOYMENT_ID: &str = WORKLOADS_NAMESPACE;
const WORKLOADS_VERSION: &str = "0.1";
const APP_INGRESS_MANIFEST: &str = "workloads/app-ingress.yaml";
const SERVICE_ACCOUNT_MANIFEST: &str = "workloads/service-account.yaml";
const APP_INGRESS_NAMESPACE: &str = "app-ingress";

/// Secret holding the gitea credentials used by pipelines
pub const GITEA_CREDS_SECRET: &str = "gitea-creds";

#[derive(Debug, Clone)]
pub struct WorkloadsConfig {
    pub namespace: String,
    /// Scheme of the external gitea URL handed to pipelines
    pub gitea_protocol: String,
    pub timeout: Duration,
}

impl Default for WorkloadsConfig {
    fn default() -> Self {
        Self {
            namespace: WORKLOADS_NAMESPACE.to_string(),
            gitea_protocol: "http".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct Workloads {
    config: WorkloadsConfig,
}

impl Workloads {
    pub fn new(config: WorkloadsConfig) -> Self {
        Self { config }
    }

    fn gitea_creds(&self, domain: &str) -> SecretSpec {
        let gitea_host = format!("{}.{}", GITEA_DEPLOYMENT_ID, domain);
        SecretSpec {
            name: GITEA_CREDS_SECRET.to_string(),
            namespace: self.config.namespace.clone(),
            secret_type: "kubernetes.io/basic-auth".to_string(),
            annotations: BTreeMap::from([
                (
                    "tekton.dev/git-0".to_string(),
                    "http://gitea-http.gitea:10080".to_string(),
                ),
                (
                    "tekton.dev/git-1".to_string(),
                    format!("{}://{}", self.config.gitea_protocol, gitea_host),
                ),
            ]),
            data: BTreeMap::from([
                ("username".to_string(), GITEA_DEFAULT_USERNAME.to_string()),
                ("password".to_string(), GITEA_DEFAULT_PASSWORD.to_string()),
            ]),
        }
    }
}

#[async_trait]
impl Deployment for Workloads {
    fn id(&self) -> &str {
        WORKLOADS_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!("Workloads version: {}", WORKLOADS_VERSION)
    }

    fn version(&self) -> String {
        WORKLOADS_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let ns = self.config.namespace.as_str();
        if ctx.cluster.namespace_exists(ns).await? {
            warn!("Namespace {} already present, skipping installation", ns);
            return Ok(());
        }

        info!("Deploying Workloads...");
        let domain = system_domain(options, WORKLOADS_DEPLOYMENT_ID)?;
        create_owned_namespace(ctx.cluster.as_ref(), ns).await?;
        ctx.cluster
            .create_secret(&self.gitea_creds(&domain))
            .await
            .context("Failed creating gitea credentials secret")?;
        ctx.tools
            .apply_content(&assets::manifest(SERVICE_ACCOUNT_MANIFEST)?, Some(ns))
            .await
            .context("Failed creating workloads service account")?;

        if !ctx.cluster.has_capability(Capability::Istio).await? {
            create_owned_namespace(ctx.cluster.as_ref(), APP_INGRESS_NAMESPACE).await?;
            ctx.tools
                .apply_content(&assets::manifest(APP_INGRESS_MANIFEST)?, None)
                .await
                .with_context(|| format!("Installing {} failed", APP_INGRESS_MANIFEST))?;
            label_namespace_owned(ctx.cluster.as_ref(), APP_INGRESS_NAMESPACE).await?;
            wait_until_pod_by_selector_exists(
                ctx.cluster.as_ref(),
                APP_INGRESS_NAMESPACE,
                "name=app-ingress",
                self.config.timeout,
            )
            .await
            .context("failed waiting app-ingress deployment to exist")?;
        }

        info!("Workloads deployed");
        Ok(())
    }

    async fn upgrade(&self, _ctx: &InstallContext, _options: &InstallationOptions) -> Result<()> {
        info!("Workloads upgrade not supported, skipping");
        Ok(())
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Workloads...");
        let ns = self.config.namespace.as_str();
        if !owned_or_skip(ctx, ns, "Workloads").await? {
            return Ok(());
        }
        delete_owned_namespace(ctx.cluster.as_ref(), ns, self.config.timeout)
            .await
            .with_context(|| format!("Failed deleting namespace {}", ns))?;

        if owned_or_skip(ctx, APP_INGRESS_NAMESPACE, "app-ingress").await? {
            ctx.tools
                .delete_content(&assets::manifest(APP_INGRESS_MANIFEST)?, None)
                .await
                .with_context(|| format!("Deleting {} failed", APP_INGRESS_MANIFEST))?;
            delete_owned_namespace(ctx.cluster.as_ref(), APP_INGRESS_NAMESPACE, self.config.timeout)
                .await?;
        }

        info!("Workloads removed");
        Ok(())
    }
}
