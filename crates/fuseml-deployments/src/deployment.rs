//! Deployment lifecycle trait

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use fuseml_core::options::InstallationOptions;
use fuseml_kube::InstallContext;

/// A platform component the installer manages
///
/// Every operation is safe to repeat:
///
/// - `deploy` skips a component that is already present
/// - `upgrade` fails when the component is not installed
/// - `delete` leaves namespaces the installer does not own untouched
#[async_trait]
pub trait Deployment: Send + Sync {
    /// Stable identifier, also the scope of component specific options
    fn id(&self) -> &str;

    /// One line summary for `fuseml info`
    fn describe(&self) -> String;

    fn version(&self) -> String;

    async fn deploy(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()>;

    async fn upgrade(&self, ctx: &InstallContext, options: &InstallationOptions) -> Result<()>;

    async fn delete(&self, ctx: &InstallContext) -> Result<()>;

    /// Save component state to `dir`; nothing to save by default
    async fn backup(&self, _ctx: &InstallContext, _dir: &Path) -> Result<()> {
        Ok(())
    }

    /// Restore component state from `dir`; nothing to restore by default
    async fn restore(&self, _ctx: &InstallContext, _dir: &Path) -> Result<()> {
        Ok(())
    }
}
