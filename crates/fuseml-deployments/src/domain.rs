//! System domain discovery
//!
//! When no domain is given the ingress load balancer address is turned into
//! a wildcard DNS name (`<ip>.nip.io`). The ingress is the Istio gateway if
//! present, the k3s traefik service otherwise.

use std::time::Duration;

use anyhow::{Context, Result};
use fuseml_core::options::InstallationOptions;
use fuseml_core::wait::run_to_success_with_timeout;
use fuseml_core::Error;
use fuseml_kube::{Capability, InstallContext};
use tracing::info;

use crate::options::SYSTEM_DOMAIN;

/// How long to wait for the load balancer to get an address
pub const LOAD_BALANCER_TIMEOUT: Duration = Duration::from_secs(120);
pub const LOAD_BALANCER_INTERVAL: Duration = Duration::from_secs(3);

const KNATIVE_NAMESPACE: &str = "knative-serving";

/// Service whose external address backs the system domain
async fn ingress_service(ctx: &InstallContext) -> Result<(&'static str, &'static str)> {
    if ctx.cluster.has_capability(Capability::Istio).await? {
        Ok(("istio-system", "istio-ingressgateway"))
    } else {
        Ok(("kube-system", "traefik"))
    }
}

/// Fill in `system_domain` from the load balancer when it is empty
pub async fn ensure_system_domain(
    ctx: &InstallContext,
    options: &mut InstallationOptions,
) -> Result<String> {
    let current = options.get_string(SYSTEM_DOMAIN, "")?;
    if !current.is_empty() {
        return Ok(current);
    }

    let (namespace, service) = ingress_service(ctx).await?;
    info!("Waiting for LoadBalancer IP on {} service", service);

    let ip = run_to_success_with_timeout(
        || async {
            ctx.cluster
                .load_balancer_ip(namespace, service)
                .await?
                .filter(|ip| !ip.is_empty())
                .ok_or_else(|| Error::not_found("load balancer address", service))
        },
        LOAD_BALANCER_TIMEOUT,
        LOAD_BALANCER_INTERVAL,
    )
    .await
    .map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!(
                "Timed out waiting for LoadBalancer IP on {} service. \
                 Ensure your kubernetes platform has the ability to provision \
                 LoadBalancer IP address.\n\n\
                 Follow these steps to enable this ability\n\
                 https://github.com/fuseml/fuseml/blob/main/docs/install.md",
                service
            )
        } else {
            anyhow::Error::new(Error::from(e))
        }
    })?;

    let domain = format!("{}.nip.io", ip);
    options
        .set(SYSTEM_DOMAIN, None, domain.as_str())
        .context("Couldn't set system_domain option")?;
    info!("Using system domain {}", domain);
    Ok(domain)
}

/// Make the system domain knative serving's default domain
pub async fn configure_knative_domain(ctx: &InstallContext, domain: &str) -> Result<()> {
    if !ctx.cluster.has_capability(Capability::Knative).await? {
        return Ok(());
    }

    info!("Configuring knative serving domain");
    let patch = format!(r#"{{"data":{{"{}":""}}}}"#, domain);
    ctx.tools
        .kubectl([
            "patch",
            "configmap",
            "config-domain",
            "-n",
            KNATIVE_NAMESPACE,
            "--type",
            "merge",
            "-p",
            patch.as_str(),
        ])
        .await
        .context("Failed patching knative domain configmap")?;
    Ok(())
}
