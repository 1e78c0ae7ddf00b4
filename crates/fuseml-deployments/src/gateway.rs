//! Exposing services under the system domain
//!
//! With Istio a `Gateway` plus `VirtualService` pair routes the host to the
//! service. Without it a plain traefik `Ingress` is created instead.

use anyhow::{Context, Result};
use fuseml_kube::{Capability, InstallContext};
use serde::Serialize;
use tracing::info;

use crate::assets::Templates;

/// A host routed to a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Base name of the created objects
    pub name: String,
    pub namespace: String,
    /// Fully qualified host, e.g. `gitea.10.0.0.1.nip.io`
    pub host: String,
    pub service_host: String,
    pub service_port: u16,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        host: impl Into<String>,
        service_host: impl Into<String>,
        service_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            host: host.into(),
            service_host: service_host.into(),
            service_port,
        }
    }

    pub fn render_istio(&self, templates: &Templates) -> Result<String> {
        templates.render("gateway.yaml.tera", &tera::Context::from_serialize(self)?)
    }

    pub fn render_ingress(&self, templates: &Templates) -> Result<String> {
        templates.render("ingress.yaml.tera", &tera::Context::from_serialize(self)?)
    }
}

/// Create an Istio gateway for `route`
pub async fn create_istio_gateway(ctx: &InstallContext, route: &Route) -> Result<()> {
    info!("Creating istio ingress gateway for {}", route.host);
    let manifest = route.render_istio(&Templates::new()?)?;
    ctx.tools
        .apply_content(&manifest, None)
        .await
        .with_context(|| format!("Failed creating istio gateway for {}", route.host))?;
    Ok(())
}

/// Route through Istio when present, otherwise through an ingress
pub async fn expose(ctx: &InstallContext, route: &Route) -> Result<()> {
    if ctx.cluster.has_capability(Capability::Istio).await? {
        return create_istio_gateway(ctx, route).await;
    }

    info!("Creating ingress for {}", route.host);
    let manifest = route.render_ingress(&Templates::new()?)?;
    ctx.tools
        .apply_content(&manifest, None)
        .await
        .with_context(|| format!("Failed creating ingress for {}", route.host))?;
    Ok(())
}
