//! Namespace ownership tracking
//!
//! Namespaces created by the installer carry the label
//! `fuse.ml/deployment: "true"`. Destructive operations check the label
//! first: a namespace that exists without it belongs to someone else and is
//! left alone.
//!
//! Existence and ownership are separate facts. A namespace that does not
//! exist is neither owned nor foreign.

use std::collections::BTreeMap;
use std::time::Duration;

use fuseml_core::wait::wait_until_gone;
use fuseml_core::Result;
use tracing::{debug, info, warn};

use crate::cluster::Cluster;

pub const OWNERSHIP_LABEL_KEY: &str = "fuse.ml/deployment";
pub const OWNERSHIP_LABEL_VALUE: &str = "true";

/// Ownership state of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceState {
    Absent,
    Owned,
    /// Exists but was not created by the installer
    Foreign,
}

/// Look up a namespace and classify it
pub async fn namespace_state(cluster: &dyn Cluster, name: &str) -> Result<NamespaceState> {
    let state = match cluster.namespace_labels(name).await? {
        None => NamespaceState::Absent,
        Some(labels) if is_owned(&labels) => NamespaceState::Owned,
        Some(_) => NamespaceState::Foreign,
    };
    debug!("Namespace {} is {:?}", name, state);
    Ok(state)
}

pub async fn namespace_exists_and_owned(cluster: &dyn Cluster, name: &str) -> Result<bool> {
    Ok(namespace_state(cluster, name).await? == NamespaceState::Owned)
}

pub async fn namespace_exists_and_not_owned(cluster: &dyn Cluster, name: &str) -> Result<bool> {
    Ok(namespace_state(cluster, name).await? == NamespaceState::Foreign)
}

/// Mark a namespace as owned
pub async fn label_namespace_owned(cluster: &dyn Cluster, name: &str) -> Result<()> {
    cluster
        .label_namespace(name, OWNERSHIP_LABEL_KEY, OWNERSHIP_LABEL_VALUE)
        .await
}

/// Create a namespace with the ownership label, reusing it if it already exists
///
/// The label is part of the create request, so a namespace created here is
/// never observable without it.
pub async fn create_owned_namespace(cluster: &dyn Cluster, name: &str) -> Result<()> {
    if cluster.namespace_exists(name).await? {
        debug!("Namespace {} already exists", name);
        return Ok(());
    }
    info!("Creating namespace {}", name);
    cluster.create_namespace(name, &ownership_labels()).await
}

/// Delete a namespace only if the installer owns it, then wait until it is gone
///
/// Returns `false` when the namespace was absent or foreign and was left alone.
pub async fn delete_owned_namespace(
    cluster: &dyn Cluster,
    name: &str,
    timeout: Duration,
) -> Result<bool> {
    match namespace_state(cluster, name).await? {
        NamespaceState::Absent => {
            debug!("Namespace {} does not exist, nothing to delete", name);
            return Ok(false);
        }
        NamespaceState::Foreign => {
            warn!(
                "Namespace {} was not created by FuseML, not deleting it",
                name
            );
            return Ok(false);
        }
        NamespaceState::Owned => {}
    }

    info!("Deleting namespace {}", name);
    cluster.delete_namespace(name).await?;
    wait_until_gone(|| cluster.namespace_exists(name), timeout)
        .await
        .map_err(|e| e.into_error(format!("namespace {} to be deleted", name)))?;
    Ok(true)
}

/// Labels that mark a namespace as owned
pub fn ownership_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(
        OWNERSHIP_LABEL_KEY.to_string(),
        OWNERSHIP_LABEL_VALUE.to_string(),
    )])
}

fn is_owned(labels: &BTreeMap<String, String>) -> bool {
    labels.get(OWNERSHIP_LABEL_KEY).map(String::as_str) == Some(OWNERSHIP_LABEL_VALUE)
}
