//! CI pipeline engine (tekton), installed through the tekton operator

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_core::wait::{retry_with_backoff, wait_until_exists, Backoff};
use fuseml_core::{Error, DEFAULT_TIMEOUT_SECS, WORKLOADS_NAMESPACE};
use fuseml_kube::ownership::{delete_owned_namespace, label_namespace_owned};
use fuseml_kube::{InstallContext, KubectlWait};
use tracing::{debug, info, warn};

use super::{owned_or_skip, require_installed, system_domain};
use crate::assets;
use crate::deployment::Deployment;
use crate::gateway::{expose, Route};

pub const TEKTON_DEPLOYMENT_ID: &str = "tekton-pipelines";
const TEKTON_OPERATOR_VERSION: &str = "v0.49.0";
const PROFILE_MANIFEST: &str = "tekton/profile-all.yaml";
const TRIGGERS_SA_MANIFEST: &str = "tekton/sa.yaml";
const FUSEML_TASKS: [&str; 3] = ["clone", "kaniko", "builder-prep"];
const OPERATOR_CRDS: [&str; 6] = [
    "tektonconfigs.operator.tekton.dev",
    "tektondashboards.operator.tekton.dev",
    "tektoninstallersets.operator.tekton.dev",
    "tektonpipelines.operator.tekton.dev",
    "tektonresults.operator.tekton.dev",
    "tektontriggers.operator.tekton.dev",
];

#[derive(Debug, Clone)]
pub struct TektonConfig {
    /// Namespace the operator installs tekton into
    pub namespace: String,
    pub operator_namespace: String,
    /// Operator release manifest, path or URL
    pub operator_manifest: String,
    pub timeout: Duration,
    /// Retry policy for applying the operator profile
    pub profile_backoff: Backoff,
    /// Namespace the FuseML tasks and trigger account live in
    pub workloads_namespace: String,
}

impl Default for TektonConfig {
    fn default() -> Self {
        Self {
            namespace: TEKTON_DEPLOYMENT_ID.to_string(),
            operator_namespace: "tekton-operator".to_string(),
            operator_manifest: format!(
                "https://storage.googleapis.com/tekton-releases/operator/previous/{}/release.yaml",
                TEKTON_OPERATOR_VERSION
            ),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            profile_backoff: Backoff::default(),
            workloads_namespace: WORKLOADS_NAMESPACE.to_string(),
        }
    }
}

pub struct Tekton {
    config: TektonConfig,
}

impl Tekton {
    pub fn new(config: TektonConfig) -> Self {
        Self { config }
    }

    async fn install_operator(&self, ctx: &InstallContext) -> Result<()> {
        let op_ns = self.config.operator_namespace.as_str();
        ctx.tools
            .apply_file(&self.config.operator_manifest, None)
            .await
            .with_context(|| format!("installing {} failed", self.config.operator_manifest))?;
        label_namespace_owned(ctx.cluster.as_ref(), op_ns).await?;

        for crd in OPERATOR_CRDS {
            ctx.tools
                .wait_for(&KubectlWait {
                    resource: format!("crd/{}", crd),
                    condition: "established".to_string(),
                    selector: None,
                    namespace: None,
                    timeout: self.config.timeout,
                })
                .await
                .with_context(|| format!("Establish CRD {} failed", crd))?;
        }

        ctx.tools
            .wait_for(
                &KubectlWait::pods_ready(op_ns, self.config.timeout)
                    .with_selector("app=tekton-operator"),
            )
            .await
            .context("Waiting for tekton-operator pod to be ready failed")?;
        Ok(())
    }

    async fn apply_profile(&self, ctx: &InstallContext, domain: &str) -> Result<()> {
        let ns = self.config.namespace.as_str();
        let profile = assets::manifest(PROFILE_MANIFEST)?;

        // the operator webhook rejects the profile until it is serving
        retry_with_backoff(&self.config.profile_backoff, || {
            ctx.tools.apply_content(&profile, None)
        })
        .await
        .map_err(Error::from)
        .with_context(|| format!("installing {} failed", PROFILE_MANIFEST))?;

        wait_until_exists(|| ctx.cluster.namespace_exists(ns), self.config.timeout)
            .await
            .map_err(|e| e.into_error(format!("namespace {} to exist", ns)))
            .with_context(|| format!("error waiting for namespace {}", ns))?;
        label_namespace_owned(ctx.cluster.as_ref(), ns).await?;

        let route = Route::new(
            "tekton",
            ns,
            format!("tekton.{}", domain),
            "tekton-dashboard",
            9097,
        );
        expose(ctx, &route)
            .await
            .context("Creating Tekton dashboard ingress failed")?;
        Ok(())
    }

    async fn apply(
        &self,
        ctx: &InstallContext,
        options: &InstallationOptions,
        upgrade: bool,
    ) -> Result<()> {
        let ns = self.config.namespace.as_str();

        if upgrade || !ctx.cluster.namespace_exists(&self.config.operator_namespace).await? {
            self.install_operator(ctx).await?;
        } else {
            warn!("Tekton Operator already present, skipping its installation");
        }

        let domain = system_domain(options, TEKTON_DEPLOYMENT_ID)?;
        if !upgrade {
            self.apply_profile(ctx, &domain).await?;
        }

        ctx.tools
            .wait_for(&KubectlWait {
                resource: "tektonconfig/config".to_string(),
                condition: "Ready".to_string(),
                selector: None,
                namespace: Some(ns.to_string()),
                timeout: self.config.timeout,
            })
            .await
            .context("Waiting for tekton to be ready failed")?;

        let workloads = self.config.workloads_namespace.as_str();
        ctx.tools
            .apply_content(&assets::workloads_manifest(TRIGGERS_SA_MANIFEST, workloads)?, None)
            .await
            .context("Installing Tekton triggers Service Account failed")?;

        for task in FUSEML_TASKS {
            let manifest =
                assets::workloads_manifest(&format!("tekton/tasks/{}.yaml", task), workloads)?;
            ctx.tools
                .apply_content(&manifest, None)
                .await
                .with_context(|| format!("Installing FuseML task {} failed", task))?;
        }

        info!("Tekton deployed (http://tekton.{})", domain);
        Ok(())
    }

    /// Remove the tekton config and wait for the operator to tear tekton down
    async fn remove_tekton(&self, ctx: &InstallContext) -> Result<()> {
        let ns = self.config.namespace.as_str();
        ctx.tools
            .delete_content(&assets::manifest(PROFILE_MANIFEST)?, None)
            .await
            .with_context(|| format!("Deleting {} failed", PROFILE_MANIFEST))?;
        let workloads = self.config.workloads_namespace.as_str();
        ctx.tools
            .delete_content(&assets::workloads_manifest(TRIGGERS_SA_MANIFEST, workloads)?, None)
            .await
            .context("Deleting Tekton triggers Service Account and Roles failed")?;

        let timeout = format!("--timeout={}s", self.config.timeout.as_secs());
        let waited = ctx
            .tools
            .kubectl(["wait", "--for=delete", timeout.as_str(), "-n", ns, "tektonconfig/config"])
            .await;
        match waited {
            Ok(_) => Ok(()),
            Err(Error::ToolInvocation { output, .. }) if output.contains("not found") => {
                debug!("tektonconfig/config already gone");
                Ok(())
            }
            Err(e) => Err(e).context("Waiting for tekton to be deleted failed"),
        }
    }
}

#[async_trait]
impl Deployment for Tekton {
    fn id(&self) -> &str {
        TEKTON_DEPLOYMENT_ID
    }

    fn describe(&self) -> String {
        format!(
            "Tekton Operator: {}, profile: {}",
            self.config.operator_manifest, PROFILE_MANIFEST
        )
    }

    fn version(&self) -> String {
        TEKTON_OPERATOR_VERSION.to_string()
    }

    async fn deploy(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        if ctx.cluster.namespace_exists(&self.config.namespace).await? {
            warn!(
                "Namespace {} already present, skipping installation",
                self.config.namespace
            );
            return Ok(());
        }

        info!("Deploying Tekton...");
        self.apply(ctx, options, false).await
    }

    async fn upgrade(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        require_installed(ctx, &self.config.namespace, "Tekton").await?;
        info!("Upgrading Tekton...");
        self.apply(ctx, options, true).await
    }

    async fn delete(&self, ctx: &InstallContext) -> Result<()> {
        info!("Removing Tekton...");
        let mut removed = false;

        for ns in [&self.config.namespace, &self.config.operator_namespace] {
            if !owned_or_skip(ctx, ns, "Tekton").await? {
                continue;
            }
            if *ns == self.config.namespace {
                self.remove_tekton(ctx).await?;
            } else {
                ctx.tools
                    .delete_file(&self.config.operator_manifest, None)
                    .await
                    .with_context(|| format!("Deleting {} failed", self.config.operator_manifest))?;
            }
            delete_owned_namespace(ctx.cluster.as_ref(), ns, self.config.timeout)
                .await
                .with_context(|| format!("Failed deleting namespace {}", ns))?;
            removed = true;
        }

        if removed {
            info!("Tekton removed");
        }
        Ok(())
    }
}
