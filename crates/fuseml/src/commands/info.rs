//! Info command

use anyhow::{Context, Result};
use fuseml_deployments::{PlatformConfig, Sequencer};
use fuseml_kube::Capability;

use super::Session;
use crate::output;

pub async fn run(session: Session) -> Result<()> {
    let cluster = session.ctx.cluster.as_ref();

    output::header("FuseML Environment");
    output::kv("FuseML version", env!("CARGO_PKG_VERSION"));

    let server = cluster
        .server_version()
        .await
        .context("Failed to get the kubernetes server version")?;
    output::kv("Kubernetes version", &server);

    for capability in [Capability::Istio, Capability::Knative, Capability::Traefik] {
        let present = cluster.has_capability(capability).await?;
        output::kv(&capability.to_string(), if present { "present" } else { "absent" });
    }

    let domain = &session.config.system_domain;
    output::kv(
        "System domain",
        if domain.is_empty() { "(not set)" } else { domain },
    );

    output::header("Components");
    for deployment in Sequencer::platform(PlatformConfig::from_config(&session.config)).deployments() {
        output::kv(deployment.id(), &deployment.version());
    }

    Ok(())
}
