//! Cluster and command runner fakes for component tests

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use fuseml_core::{Error, Result};
use fuseml_kube::ownership::ownership_labels;
use fuseml_kube::{Cluster, CommandRunner, Invocation, PodStatus, SecretSpec};

#[derive(Default)]
struct ClusterState {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
    secrets: BTreeMap<(String, String), BTreeMap<String, String>>,
    services: BTreeSet<(String, String)>,
    pods: BTreeMap<String, Vec<PodStatus>>,
    load_balancers: BTreeMap<(String, String), String>,
    created_namespaces: Vec<String>,
    deleted_namespaces: Vec<String>,
    created_secrets: Vec<SecretSpec>,
}

/// In-memory cluster
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace, labelled as owned or not
    pub fn with_namespace(self, name: &str, owned: bool) -> Self {
        let labels = if owned {
            ownership_labels()
        } else {
            BTreeMap::new()
        };
        self.state
            .lock()
            .unwrap()
            .namespaces
            .insert(name.to_string(), labels);
        self
    }

    pub fn with_service(self, namespace: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .services
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let data = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }

    pub fn with_running_pod(self, namespace: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .pods
            .entry(namespace.to_string())
            .or_default()
            .push(PodStatus {
                name: name.to_string(),
                phase: "Running".to_string(),
                ready: true,
            });
        self
    }

    pub fn with_load_balancer(self, namespace: &str, service: &str, ip: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .services
                .insert((namespace.to_string(), service.to_string()));
            state
                .load_balancers
                .insert((namespace.to_string(), service.to_string()), ip.to_string());
        }
        self
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains_key(name)
    }

    pub fn labels(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.state.lock().unwrap().namespaces.get(name).cloned()
    }

    pub fn created_namespaces(&self) -> Vec<String> {
        self.state.lock().unwrap().created_namespaces.clone()
    }

    pub fn deleted_namespaces(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_namespaces.clone()
    }

    pub fn created_secrets(&self) -> Vec<SecretSpec> {
        self.state.lock().unwrap().created_secrets.clone()
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn namespace_labels(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.state.lock().unwrap().namespaces.get(name).cloned())
    }

    async fn create_namespace(&self, name: &str, labels: &BTreeMap<String, String>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.namespaces.contains_key(name) {
            return Err(Error::tool_invocation(
                "kubectl create",
                format!("namespaces \"{}\" already exists", name),
            ));
        }
        state.namespaces.insert(name.to_string(), labels.clone());
        state.created_namespaces.push(name.to_string());
        Ok(())
    }

    async fn label_namespace(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let labels = state
            .namespaces
            .get_mut(name)
            .ok_or_else(|| Error::not_found("namespace", name))?;
        labels.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.namespaces.remove(name).is_some() {
            state.deleted_namespaces.push(name.to_string());
        }
        Ok(())
    }

    async fn list_pods(&self, namespace: &str, _selector: &str) -> Result<Vec<PodStatus>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pods
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found("secret", format!("{}/{}", namespace, name)))
    }

    async fn create_secret(&self, secret: &SecretSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.secrets.insert(
            (secret.namespace.clone(), secret.name.clone()),
            secret.data.clone(),
        );
        state.created_secrets.push(secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .services
            .contains(&(namespace.to_string(), name.to_string())))
    }

    async fn load_balancer_ip(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .load_balancers
            .get(&(namespace.to_string(), service.to_string()))
            .cloned())
    }

    async fn server_version(&self) -> Result<String> {
        Ok("v1.21.2".to_string())
    }
}

/// Canned response for commands containing a pattern
#[derive(Clone, Debug)]
enum Response {
    Output(String),
    Failure(String),
}

/// Command runner that records every invocation
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    responses: Mutex<Vec<(String, Response)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `stdout` to commands whose command line contains `pattern`
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), Response::Output(stdout.to_string())));
    }

    /// Fail commands whose command line contains `pattern`
    pub fn fail(&self, pattern: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), Response::Failure(output.to_string())));
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Manifests piped to `kubectl` through standard input
    pub fn applied_manifests(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|i| i.args.first().map(String::as_str) == Some("apply"))
            .filter_map(|i| i.stdin)
            .collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let line = invocation.command_line();

        let responses = self.responses.lock().unwrap();
        match responses.iter().find(|(pattern, _)| line.contains(pattern.as_str())) {
            Some((_, Response::Output(out))) => Ok(out.clone()),
            Some((_, Response::Failure(out))) => Err(Error::tool_invocation(line, out.clone())),
            None => Ok(String::new()),
        }
    }
}
