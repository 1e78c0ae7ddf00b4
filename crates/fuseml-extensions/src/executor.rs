//! Installing and removing one extension
//!
//! An extension's namespace (and any namespace a single step declares) is
//! only touched when the installer owns it. A namespace that already exists
//! without the ownership label means the software is managed elsewhere:
//! install treats the extension as present, uninstall leaves it alone.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use fuseml_core::options::InstallationOptions;
use fuseml_core::{Error, WORKLOADS_NAMESPACE};
use fuseml_deployments::options::SYSTEM_DOMAIN;
use fuseml_deployments::{create_istio_gateway, Route};
use fuseml_kube::ownership::{
    create_owned_namespace, delete_owned_namespace, label_namespace_owned,
    namespace_exists_and_not_owned,
};
use fuseml_kube::{Capability, ChartInstall, InstallContext, KubectlWait, UninstallOutcome};
use tracing::{debug, info, warn};

use crate::descriptor::{ExtensionDescriptor, InstallStep, StepType, WaitCondition};
use crate::source::ExtensionSource;

/// File mode given to downloaded scripts before they run
#[cfg(unix)]
const SCRIPT_MODE: u32 = 0o740;

/// A loaded extension, ready to install or remove
#[derive(Debug, Clone)]
pub struct Extension {
    pub name: String,
    pub descriptor: ExtensionDescriptor,
    source: ExtensionSource,
    timeout: Duration,
    /// Shared namespace that uninstall never deletes
    workloads_namespace: String,
}

impl Extension {
    /// Read the description of `name` from `repository`
    pub async fn load(
        name: &str,
        repository: &str,
        timeout: Duration,
    ) -> fuseml_core::Result<Self> {
        let source = ExtensionSource::new(name, repository)
            .map_err(|e| Error::descriptor_parse(name, format!("{:#}", e)))?;

        let tmp = tempfile::tempdir()?;
        let path = source
            .fetch_description(tmp.path())
            .await
            .map_err(|e| Error::descriptor_parse(name, format!("{:#}", e)))?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::descriptor_parse(
                name,
                format!("failed to read description file {}: {}", path.display(), e),
            )
        })?;

        let descriptor = ExtensionDescriptor::from_yaml(name, &content)?;
        debug!(
            "Loaded extension {} {} from {}",
            name, descriptor.version, repository
        );
        Ok(Self::from_descriptor(name, descriptor, source, timeout))
    }

    pub fn from_descriptor(
        name: &str,
        mut descriptor: ExtensionDescriptor,
        source: ExtensionSource,
        timeout: Duration,
    ) -> Self {
        if descriptor.name.is_empty() {
            descriptor.name = name.to_string();
        }
        Self {
            name: name.to_string(),
            descriptor,
            source,
            timeout,
            workloads_namespace: WORKLOADS_NAMESPACE.to_string(),
        }
    }

    pub fn with_workloads_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.workloads_namespace = namespace.into();
        self
    }

    /// Names of the extensions this one requires
    pub fn requires(&self) -> &[String] {
        &self.descriptor.requires
    }

    fn namespace(&self) -> &str {
        &self.descriptor.namespace
    }

    /// Run the install steps, then expose the declared gateways
    pub async fn install(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()> {
        let cluster = ctx.cluster.as_ref();
        let namespace = self.namespace();

        if !namespace.is_empty() {
            if namespace_exists_and_not_owned(cluster, namespace).await? {
                warn!(
                    "Namespace {} is already present: assuming extension {} is already installed",
                    namespace, self.name
                );
                return Ok(());
            }
            create_owned_namespace(cluster, namespace).await?;
        }

        let tmp = tempfile::tempdir().context("can't create temp directory")?;

        for step in &self.descriptor.install {
            let step_ns = if step.namespace.is_empty() {
                namespace
            } else {
                if namespace_exists_and_not_owned(cluster, &step.namespace).await? {
                    warn!(
                        "Namespace exists but {} was not created by FuseML; skipping {} step of extension {}",
                        step.namespace, step.step_type, self.name
                    );
                    continue;
                }
                create_owned_namespace(cluster, &step.namespace).await?;
                step.namespace.as_str()
            };

            self.install_step(ctx, step, step_ns, tmp.path())
                .await
                .with_context(|| install_failure(step))?;

            if !step.namespace.is_empty() && step.namespace != namespace {
                label_namespace_owned(cluster, &step.namespace).await?;
            }

            for condition in &step.wait_for {
                let wait = self.wait_spec(condition, step_ns);
                ctx.tools.wait_for(&wait).await.with_context(|| {
                    format!(
                        "waiting for install step to finish waiting for {} failed",
                        wait.resource
                    )
                })?;
            }
        }

        if !namespace.is_empty() {
            label_namespace_owned(cluster, namespace).await?;
        }

        if !self.descriptor.gateways.is_empty()
            && ctx.cluster.has_capability(Capability::Istio).await?
        {
            let domain = options
                .get_string(SYSTEM_DOMAIN, "")
                .context("system_domain value not provided")?;
            for gateway in &self.descriptor.gateways {
                let gateway_ns = if gateway.namespace.is_empty() {
                    namespace
                } else {
                    gateway.namespace.as_str()
                };
                let host = format!("{}.{}", gateway.name, domain);
                let route = Route::new(
                    &gateway.name,
                    gateway_ns,
                    &host,
                    &gateway.service_host,
                    gateway.port,
                );
                create_istio_gateway(ctx, &route).await?;
                info!("{} accessible at http://{}", gateway.name, host);
            }
        }

        Ok(())
    }

    /// Undo the extension with its uninstall steps and drop owned namespaces
    pub async fn uninstall(&self, ctx: &InstallContext) -> Result<()> {
        let cluster = ctx.cluster.as_ref();
        let namespace = self.namespace();

        if !namespace.is_empty() && namespace_exists_and_not_owned(cluster, namespace).await? {
            warn!(
                "Namespace {} was not created by FuseML; skipping uninstall of extension {}",
                namespace, self.name
            );
            return Ok(());
        }

        let tmp = tempfile::tempdir().context("can't create temp directory")?;

        for step in &self.descriptor.uninstall {
            let own_namespace = !step.namespace.is_empty();
            if own_namespace && namespace_exists_and_not_owned(cluster, &step.namespace).await? {
                warn!(
                    "Namespace exists but {} was not created by FuseML; skipping {} step of extension {}",
                    step.namespace, step.step_type, self.name
                );
                continue;
            }
            let step_ns = if own_namespace {
                step.namespace.as_str()
            } else {
                namespace
            };

            self.uninstall_step(ctx, step, step_ns, tmp.path())
                .await
                .with_context(|| uninstall_failure(step))?;

            if own_namespace
                && step.namespace != namespace
                && step.namespace != self.workloads_namespace
            {
                delete_owned_namespace(cluster, &step.namespace, self.timeout).await?;
            }
        }

        if !namespace.is_empty() && namespace != self.workloads_namespace {
            delete_owned_namespace(cluster, namespace, self.timeout).await?;
        }

        Ok(())
    }

    async fn install_step(
        &self,
        ctx: &InstallContext,
        step: &InstallStep,
        namespace: &str,
        tmp: &Path,
    ) -> Result<()> {
        let ns = Some(namespace).filter(|ns| !ns.is_empty());
        match step.step_type {
            StepType::Helm => {
                if ctx.tools.helm_release_deployed(&self.name, ns).await? {
                    info!("Helm release {} already deployed", self.name);
                    return Ok(());
                }
                let chart = self.source.fetch_file(&step.location, tmp).await?;
                let mut install = ChartInstall::new(&self.name, chart.to_string_lossy());
                if let Some(ns) = ns {
                    install = install.namespace(ns);
                }
                if !step.values.is_empty() {
                    let values = self.source.fetch_file(&step.values, tmp).await?;
                    install = install.values(values.to_string_lossy());
                }
                ctx.tools.install_chart(&install).await?;
            }
            StepType::Manifest => {
                let path = self.source.fetch_file(&step.location, tmp).await?;
                ctx.tools.apply_file(&path.to_string_lossy(), ns).await?;
            }
            StepType::Kustomize => {
                let dir = self.source.directory_path(&step.location);
                ctx.tools.apply_kustomize(&dir, ns).await?;
            }
            StepType::Script => self.run_script(ctx, &step.location, tmp).await?,
        }
        Ok(())
    }

    async fn uninstall_step(
        &self,
        ctx: &InstallContext,
        step: &InstallStep,
        namespace: &str,
        tmp: &Path,
    ) -> Result<()> {
        let ns = Some(namespace).filter(|ns| !ns.is_empty());
        match step.step_type {
            StepType::Helm => {
                if ctx.tools.uninstall_chart(&self.name, ns).await? == UninstallOutcome::NotFound {
                    warn!("Helm release {} not found, skipping", self.name);
                }
            }
            StepType::Manifest => {
                let path = self.source.fetch_file(&step.location, tmp).await?;
                ctx.tools.delete_file(&path.to_string_lossy(), ns).await?;
            }
            StepType::Kustomize => {
                let dir = self.source.directory_path(&step.location);
                ctx.tools.delete_kustomize(&dir, ns).await?;
            }
            StepType::Script => self.run_script(ctx, &step.location, tmp).await?,
        }
        Ok(())
    }

    /// Copy a script into `tmp`, make it executable and run it there
    async fn run_script(&self, ctx: &InstallContext, location: &str, tmp: &Path) -> Result<()> {
        let fetched = self
            .source
            .fetch_file(location, tmp)
            .await
            .with_context(|| format!("failed fetching file from {}", location))?;

        let script = if fetched.starts_with(tmp) {
            fetched
        } else {
            let name = fetched
                .file_name()
                .with_context(|| format!("script location {} has no file name", location))?;
            let target = tmp.join(name);
            tokio::fs::copy(&fetched, &target)
                .await
                .with_context(|| format!("failed copying script {}", fetched.display()))?;
            target
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&script, std::fs::Permissions::from_mode(SCRIPT_MODE))
                .await
                .with_context(|| format!("Failed changing the file mode of {}", script.display()))?;
        }

        let output = ctx
            .tools
            .run_script(&script, tmp)
            .await
            .context("Failed running script")?;
        debug!("Script {} output:\n{}", location, output);
        Ok(())
    }

    fn wait_spec(&self, condition: &WaitCondition, step_namespace: &str) -> KubectlWait {
        let namespace = if condition.namespace.is_empty() {
            step_namespace
        } else {
            condition.namespace.as_str()
        };
        KubectlWait {
            resource: non_empty_or(&condition.kind, "pod"),
            condition: non_empty_or(&condition.condition, "Ready"),
            selector: Some(condition.selector.clone())
                .filter(|s| !s.is_empty() && s != "all"),
            namespace: Some(namespace.to_string()).filter(|ns| !ns.is_empty()),
            timeout: condition
                .timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(self.timeout),
        }
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn install_failure(step: &InstallStep) -> String {
    match step.step_type {
        StepType::Helm => format!("failed to install helm package from {}", step.location),
        StepType::Manifest => format!("failed to install kubernetes manifest from {}", step.location),
        StepType::Kustomize => format!(
            "failed to install from kustomize directory {}",
            step.location
        ),
        StepType::Script => format!("failed to install using {}", step.location),
    }
}

fn uninstall_failure(step: &InstallStep) -> String {
    match step.step_type {
        StepType::Helm => format!("failed to uninstall helm package {}", step.location),
        StepType::Manifest => format!(
            "failed to uninstall kubernetes manifest from {}",
            step.location
        ),
        StepType::Kustomize => format!(
            "failed to uninstall from kustomize directory {}",
            step.location
        ),
        StepType::Script => format!("failed to uninstall using {}", step.location),
    }
}
