//! `kubectl` backed [`Cluster`] implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fuseml_core::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::cluster::{Cluster, PodStatus, SecretSpec};
use crate::runner::{CommandRunner, Invocation};

/// Cluster access through the `kubectl` binary
pub struct KubectlCluster {
    runner: Arc<dyn CommandRunner>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: ObjectMeta,
    #[serde(default)]
    status: PodStatusJson,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatusJson {
    #[serde(default)]
    phase: String,
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct Secret {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default)]
    status: ServiceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceStatus {
    #[serde(default)]
    load_balancer: LoadBalancerStatus,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancerStatus {
    #[serde(default)]
    ingress: Vec<LoadBalancerIngress>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerIngress {
    ip: Option<String>,
    hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    server_version: Option<ServerVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerVersion {
    git_version: String,
}

impl KubectlCluster {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn kubectl(&self, args: Vec<String>) -> Result<String> {
        self.runner.run(&Invocation::new("kubectl").args(args)).await
    }

    async fn create_from_json(&self, object: serde_json::Value) -> Result<()> {
        let manifest = serde_json::to_string(&object)?;
        self.runner
            .run(
                &Invocation::new("kubectl")
                    .args(["create", "--filename", "-"])
                    .stdin(manifest),
            )
            .await?;
        Ok(())
    }

    /// `kubectl get` returning `None` when the object does not exist
    async fn get_json(&self, args: &[&str]) -> Result<Option<String>> {
        let mut full = vec!["get".to_string()];
        full.extend(args.iter().map(|s| s.to_string()));
        full.extend(["--ignore-not-found".to_string(), "-o".to_string(), "json".to_string()]);

        let out = self.kubectl(full).await?;
        if out.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(out))
        }
    }
}

#[async_trait]
impl Cluster for KubectlCluster {
    async fn namespace_labels(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        match self.get_json(&["namespace", name]).await? {
            Some(out) => {
                let ns: Namespace = serde_json::from_str(&out)?;
                debug!("Namespace {} has {} labels", ns.metadata.name, ns.metadata.labels.len());
                Ok(Some(ns.metadata.labels))
            }
            None => Ok(None),
        }
    }

    async fn create_namespace(&self, name: &str, labels: &BTreeMap<String, String>) -> Result<()> {
        self.create_from_json(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name, "labels": labels },
        }))
        .await
    }

    async fn label_namespace(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let patch = json!({ "metadata": { "labels": { key: value } } }).to_string();
        self.kubectl(vec![
            "patch".to_string(),
            "namespace".to_string(),
            name.to_string(),
            "--type".to_string(),
            "strategic".to_string(),
            "--patch".to_string(),
            patch,
        ])
        .await?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.kubectl(vec![
            "delete".to_string(),
            "namespace".to_string(),
            name.to_string(),
            "--ignore-not-found".to_string(),
            "--wait=false".to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodStatus>> {
        let out = self
            .kubectl(vec![
                "get".to_string(),
                "pods".to_string(),
                "--namespace".to_string(),
                namespace.to_string(),
                "--selector".to_string(),
                selector.to_string(),
                "-o".to_string(),
                "json".to_string(),
            ])
            .await?;
        let list: PodList = serde_json::from_str(&out)?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| PodStatus {
                ready: pod
                    .status
                    .conditions
                    .iter()
                    .any(|c| c.kind == "Ready" && c.status == "True"),
                name: pod.metadata.name,
                phase: pod.status.phase,
            })
            .collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        let out = self
            .get_json(&["secret", name, "--namespace", namespace])
            .await?
            .ok_or_else(|| Error::not_found("secret", format!("{}/{}", namespace, name)))?;
        let secret: Secret = serde_json::from_str(&out)?;

        secret
            .data
            .into_iter()
            .map(|(key, encoded)| {
                let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    Error::config(format!("secret {}/{} key {}: {}", namespace, name, key, e))
                })?;
                Ok((key, String::from_utf8_lossy(&bytes).into_owned()))
            })
            .collect()
    }

    async fn create_secret(&self, secret: &SecretSpec) -> Result<()> {
        let secret_type = if secret.secret_type.is_empty() {
            "Opaque"
        } else {
            secret.secret_type.as_str()
        };
        self.create_from_json(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": secret_type,
            "metadata": {
                "name": secret.name,
                "namespace": secret.namespace,
                "annotations": secret.annotations,
            },
            "stringData": secret.data,
        }))
        .await
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.kubectl(vec![
            "delete".to_string(),
            "secret".to_string(),
            name.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--ignore-not-found".to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .get_json(&["service", name, "--namespace", namespace])
            .await?
            .is_some())
    }

    async fn load_balancer_ip(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        let out = self
            .get_json(&["service", service, "--namespace", namespace])
            .await?
            .ok_or_else(|| Error::not_found("service", format!("{}/{}", namespace, service)))?;
        let svc: Service = serde_json::from_str(&out)?;

        Ok(svc
            .status
            .load_balancer
            .ingress
            .into_iter()
            .find_map(|ingress| ingress.ip.or(ingress.hostname))
            .filter(|addr| !addr.is_empty()))
    }

    async fn server_version(&self) -> Result<String> {
        let out = self
            .kubectl(vec!["version".to_string(), "-o".to_string(), "json".to_string()])
            .await?;
        let info: VersionInfo = serde_json::from_str(&out)?;
        info.server_version
            .map(|v| v.git_version)
            .ok_or_else(|| Error::not_found("server version", "kubernetes"))
    }
}
