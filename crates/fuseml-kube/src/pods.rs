//! Pod readiness waits

use std::time::Duration;

use fuseml_core::wait::wait_until_exists;
use fuseml_core::{Error, Result};
use tracing::info;

use crate::cluster::Cluster;

/// Wait until at least one pod matches `selector` in `namespace`
pub async fn wait_until_pod_by_selector_exists(
    cluster: &dyn Cluster,
    namespace: &str,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    info!("Waiting for pods {} in {} to exist", selector, namespace);
    wait_until_exists(
        || async move {
            let pods = cluster.list_pods(namespace, selector).await?;
            Ok::<_, Error>(!pods.is_empty())
        },
        timeout,
    )
    .await
    .map_err(|e| e.into_error(format!("pods {} in {} to exist", selector, namespace)))
}

/// Wait until every pod matching `selector` is running and ready
pub async fn wait_for_pod_by_selector_running(
    cluster: &dyn Cluster,
    namespace: &str,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    info!("Waiting for pods {} in {} to be running", selector, namespace);
    wait_until_exists(
        || async move {
            let pods = cluster.list_pods(namespace, selector).await?;
            Ok::<_, Error>(!pods.is_empty() && pods.iter().all(|p| p.is_running()))
        },
        timeout,
    )
    .await
    .map_err(|e| e.into_error(format!("pods {} in {} to be running", selector, namespace)))
}
