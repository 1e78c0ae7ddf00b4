//! Cluster collaborator trait

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use fuseml_core::Result;

/// Platform features the installer adapts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Istio ingress gateway is serving
    Istio,
    /// Knative serving is installed
    Knative,
    /// Traefik ingress controller (k3s default) is present
    Traefik,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Istio => "istio",
            Capability::Knative => "knative",
            Capability::Traefik => "traefik",
        };
        f.write_str(name)
    }
}

/// Summary of one pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    pub name: String,
    pub phase: String,
    pub ready: bool,
}

impl PodStatus {
    pub fn is_running(&self) -> bool {
        self.phase == "Running" && self.ready
    }
}

/// A secret to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSpec {
    pub name: String,
    pub namespace: String,
    /// Kubernetes secret type, e.g. `Opaque` or `kubernetes.io/basic-auth`
    pub secret_type: String,
    pub annotations: BTreeMap<String, String>,
    /// Plain text values, stored as `stringData`
    pub data: BTreeMap<String, String>,
}

/// Operations the installer needs from a Kubernetes cluster
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Labels of a namespace, `None` if it does not exist
    async fn namespace_labels(&self, name: &str) -> Result<Option<BTreeMap<String, String>>>;

    /// Create a namespace carrying `labels` in the same request
    async fn create_namespace(&self, name: &str, labels: &BTreeMap<String, String>) -> Result<()>;

    /// Add or overwrite one label with a strategic merge patch
    async fn label_namespace(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// Request deletion; does not wait for the namespace to disappear
    async fn delete_namespace(&self, name: &str) -> Result<()>;

    /// Pods in `namespace` matching a label selector
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodStatus>>;

    /// Decoded data of a secret; `NotFound` if absent
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>>;

    async fn create_secret(&self, secret: &SecretSpec) -> Result<()>;

    /// Delete a secret, ignoring absence
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// External address of a `LoadBalancer` service, once assigned
    async fn load_balancer_ip(&self, namespace: &str, service: &str) -> Result<Option<String>>;

    /// Kubernetes server version string
    async fn server_version(&self) -> Result<String>;

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        Ok(self.namespace_labels(name).await?.is_some())
    }

    /// Query the live cluster for a platform capability
    async fn has_capability(&self, capability: Capability) -> Result<bool> {
        match capability {
            Capability::Istio => {
                self.service_exists("istio-system", "istio-ingressgateway")
                    .await
            }
            Capability::Knative => self.namespace_exists("knative-serving").await,
            Capability::Traefik => self.service_exists("kube-system", "traefik").await,
        }
    }
}
