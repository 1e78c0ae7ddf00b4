//! Installing and removing a set of extensions
//!
//! Install resolves requirements first, then installs and registers each
//! extension in turn. Uninstall unregisters each extension before running
//! its uninstall steps, while its namespace still exists.

use anyhow::{Context, Result};
use fuseml_core::options::InstallationOptions;
use fuseml_kube::InstallContext;
use tracing::{debug, info};

use crate::dependency::{DependencyResolver, DescriptorLoader};
use crate::registry::{register_extension, unregister_extension, RegistryClient};

/// Progress callback: (current, total, extension name)
pub type ProgressCallback<'a> = Option<&'a dyn Fn(usize, usize, &str)>;

/// Installs, registers and removes extensions on one cluster
pub struct ExtensionManager<'a> {
    ctx: &'a InstallContext,
    loader: &'a dyn DescriptorLoader,
    registry: &'a RegistryClient,
}

impl<'a> ExtensionManager<'a> {
    pub fn new(
        ctx: &'a InstallContext,
        loader: &'a dyn DescriptorLoader,
        registry: &'a RegistryClient,
    ) -> Self {
        Self {
            ctx,
            loader,
            registry,
        }
    }

    /// Install `names` and everything they require
    ///
    /// Returns the installed extensions in the order they were installed.
    pub async fn install(
        &self,
        names: &[String],
        options: &InstallationOptions,
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let resolver = DependencyResolver::load(self.loader, names).await?;
        let order = resolver.install_order(names)?;
        let total = order.len();
        debug!("Installing {} extensions for {}", total, names.join(", "));

        let mut installed = Vec::with_capacity(total);
        for (index, extension) in order.into_iter().enumerate() {
            if let Some(callback) = progress {
                callback(index + 1, total, &extension.name);
            }
            extension
                .install(self.ctx, options)
                .await
                .with_context(|| format!("Failed to install extension {}", extension.name))?;
            register_extension(self.registry, extension, self.ctx.cluster.as_ref())
                .await
                .with_context(|| format!("Failed to register extension {}", extension.name))?;
            installed.push(extension.name.clone());
        }

        info!("Installed extensions: {}", installed.join(", "));
        Ok(installed)
    }

    /// Unregister and remove `names`, and their requirements when
    /// `with_dependencies` is set
    ///
    /// Returns the removed extensions in the order they were removed.
    pub async fn uninstall(
        &self,
        names: &[String],
        with_dependencies: bool,
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let resolver = if with_dependencies {
            DependencyResolver::load(self.loader, names).await?
        } else {
            DependencyResolver::load_only(self.loader, names).await?
        };
        let order = resolver.uninstall_order(names, with_dependencies)?;
        let total = order.len();

        let mut removed = Vec::with_capacity(total);
        for (index, extension) in order.into_iter().enumerate() {
            if let Some(callback) = progress {
                callback(index + 1, total, &extension.name);
            }
            unregister_extension(self.registry, &extension.name)
                .await
                .with_context(|| format!("Failed to unregister extension {}", extension.name))?;
            extension
                .uninstall(self.ctx)
                .await
                .with_context(|| format!("Failed to uninstall extension {}", extension.name))?;
            removed.push(extension.name.clone());
        }

        info!("Removed extensions: {}", removed.join(", "));
        Ok(removed)
    }
}
