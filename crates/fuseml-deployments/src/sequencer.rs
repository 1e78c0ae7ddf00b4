//! Ordered install, upgrade and removal of the platform components

use anyhow::{Context, Result};
use fuseml_core::config::FusemlConfig;
use fuseml_core::options::InstallationOptions;
use fuseml_kube::InstallContext;
use tracing::{debug, info};

use crate::components::{
    Core, CoreConfig, Gitea, GiteaConfig, Istio, IstioConfig, Registry, RegistryConfig, Tekton,
    TektonConfig, Workloads, WorkloadsConfig, CORE_DEPLOYMENT_ID, GITEA_DEPLOYMENT_ID,
    ISTIO_DEPLOYMENT_ID, REGISTRY_DEPLOYMENT_ID, TEKTON_DEPLOYMENT_ID, WORKLOADS_DEPLOYMENT_ID,
};
use crate::deployment::Deployment;
use crate::domain::{configure_knative_domain, ensure_system_domain};

/// Removal order, which differs from the reverse of the install order
const DELETE_ORDER: [&str; 6] = [
    WORKLOADS_DEPLOYMENT_ID,
    TEKTON_DEPLOYMENT_ID,
    REGISTRY_DEPLOYMENT_ID,
    GITEA_DEPLOYMENT_ID,
    CORE_DEPLOYMENT_ID,
    ISTIO_DEPLOYMENT_ID,
];

/// Components touched by `upgrade`
const UPGRADE_SET: [&str; 1] = [CORE_DEPLOYMENT_ID];

/// Configuration of every platform component
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    pub istio: IstioConfig,
    pub workloads: WorkloadsConfig,
    pub gitea: GiteaConfig,
    pub registry: RegistryConfig,
    pub tekton: TektonConfig,
    pub core: CoreConfig,
}

impl PlatformConfig {
    /// Defaults adjusted to the CLI config, with core settings from the environment
    pub fn from_config(config: &FusemlConfig) -> Self {
        let mut platform = Self {
            core: CoreConfig::from_env(),
            ..Self::default()
        };
        let namespace = &config.workloads_namespace;
        platform.workloads.namespace = namespace.clone();
        platform.workloads.gitea_protocol = config.gitea_protocol.clone();
        platform.tekton.workloads_namespace = namespace.clone();
        platform.core.workloads_namespace = namespace.clone();
        platform.core.gitea_protocol = config.gitea_protocol.clone();
        platform
    }
}

/// Runs deployments one after another, stopping at the first failure
///
/// Nothing is rolled back on failure; every step is idempotent so running
/// the same command again resumes where it stopped.
pub struct Sequencer {
    deployments: Vec<Box<dyn Deployment>>,
}

impl Sequencer {
    /// Sequencer over `deployments`, given in install order
    pub fn new(deployments: Vec<Box<dyn Deployment>>) -> Self {
        Self { deployments }
    }

    /// The FuseML platform: mesh, workloads, gitea, registry, tekton, core
    pub fn platform(config: PlatformConfig) -> Self {
        Self::new(vec![
            Box::new(Istio::new(config.istio)),
            Box::new(Workloads::new(config.workloads)),
            Box::new(Gitea::new(config.gitea)),
            Box::new(Registry::new(config.registry)),
            Box::new(Tekton::new(config.tekton)),
            Box::new(Core::new(config.core)),
        ])
    }

    pub fn deployments(&self) -> impl Iterator<Item = &dyn Deployment> {
        self.deployments.iter().map(|d| d.as_ref())
    }

    /// One description line per component, in install order
    pub fn describe(&self) -> Vec<String> {
        self.deployments().map(|d| d.describe()).collect()
    }

    /// Deploy every component in order
    ///
    /// The mesh goes first. Once it is up an empty `system_domain` is
    /// discovered and stored in `options`, so later components see it.
    pub async fn install(&self, ctx: &InstallContext, options: &mut InstallationOptions) -> Result<()> {
        let mut domain_ready = false;

        for deployment in self.deployments() {
            if !domain_ready && deployment.id() != ISTIO_DEPLOYMENT_ID {
                let domain = ensure_system_domain(ctx, options).await?;
                configure_knative_domain(ctx, &domain).await?;
                domain_ready = true;
            }

            debug!("Deploying {}", deployment.id());
            deployment
                .deploy(ctx, &options.for_deployment(deployment.id()))
                .await
                .with_context(|| format!("Failed to deploy {}", deployment.id()))?;
        }

        info!("FuseML platform installed");
        Ok(())
    }

    /// Delete every component
    ///
    /// Known components follow the fixed removal order; any others are
    /// removed afterwards in reverse install order.
    pub async fn uninstall(&self, ctx: &InstallContext) -> Result<()> {
        for deployment in self.delete_order() {
            debug!("Deleting {}", deployment.id());
            deployment
                .delete(ctx)
                .await
                .with_context(|| format!("Failed to remove {}", deployment.id()))?;
        }

        info!("FuseML platform removed");
        Ok(())
    }

    /// Upgrade the components that support in-place upgrade
    pub async fn upgrade(&self, ctx: &InstallContext, options: &mut InstallationOptions) -> Result<()> {
        ensure_system_domain(ctx, options).await?;

        for deployment in self
            .deployments()
            .filter(|d| UPGRADE_SET.contains(&d.id()))
        {
            deployment
                .upgrade(ctx, &options.for_deployment(deployment.id()))
                .await
                .with_context(|| format!("Failed to upgrade {}", deployment.id()))?;
        }

        info!("FuseML platform upgraded");
        Ok(())
    }

    fn delete_order(&self) -> Vec<&dyn Deployment> {
        let mut ordered: Vec<&dyn Deployment> = DELETE_ORDER
            .iter()
            .filter_map(|id| self.deployments().find(|d| d.id() == *id))
            .collect();
        ordered.extend(
            self.deployments
                .iter()
                .rev()
                .map(|d| d.as_ref())
                .filter(|d| !DELETE_ORDER.contains(&d.id())),
        );
        ordered
    }
}
