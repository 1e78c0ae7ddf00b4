//! Wrappers around `kubectl`, `helm`, `istioctl` and scripts
//!
//! Each method builds one [`Invocation`] and hands it to the configured
//! [`CommandRunner`], so callers never assemble command lines themselves.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fuseml_core::{Error, Result};
use tracing::{debug, info};

use crate::runner::{CommandRunner, Invocation};

/// Outcome of removing a helm release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    /// The release did not exist; nothing was done
    NotFound,
}

/// Parameters of `kubectl wait`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlWait {
    /// Resource kind, or `kind/name`
    pub resource: String,
    pub condition: String,
    /// Label selector; `None` waits for all resources of the kind
    pub selector: Option<String>,
    pub namespace: Option<String>,
    pub timeout: Duration,
}

impl KubectlWait {
    /// Wait for every pod in `namespace` to be Ready
    pub fn pods_ready(namespace: impl Into<String>, timeout: Duration) -> Self {
        Self {
            resource: "pod".to_string(),
            condition: "Ready".to_string(),
            selector: None,
            namespace: Some(namespace.into()),
            timeout,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

/// A helm chart to install or upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartInstall {
    pub release: String,
    /// Chart reference: local path, archive or URL
    pub chart: String,
    pub namespace: Option<String>,
    pub values: Option<String>,
    /// Extra `--set key=value` pairs
    pub set: Vec<(String, String)>,
    /// Run `helm upgrade` instead of `helm install`
    pub upgrade: bool,
}

impl ChartInstall {
    pub fn new(release: impl Into<String>, chart: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            chart: chart.into(),
            namespace: None,
            values: None,
            set: Vec::new(),
            upgrade: false,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into()).filter(|ns: &String| !ns.is_empty());
        self
    }

    pub fn values(mut self, values: impl Into<String>) -> Self {
        self.values = Some(values.into()).filter(|v: &String| !v.is_empty());
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.push((key.into(), value.into()));
        self
    }

    pub fn upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }
}

/// External tool facade
#[derive(Clone)]
pub struct Toolbox {
    runner: Arc<dyn CommandRunner>,
}

impl Toolbox {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run `kubectl` with arbitrary arguments
    pub async fn kubectl<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String>,
    {
        self.runner.run(&Invocation::new("kubectl").args(args)).await
    }

    /// `kubectl apply --filename <path> [--namespace ns]`
    pub async fn apply_file(&self, path: &str, namespace: Option<&str>) -> Result<String> {
        self.kubectl_with_namespace(vec!["apply", "--filename", path], namespace)
            .await
    }

    /// `kubectl delete --filename <path> --ignore-not-found [--namespace ns]`
    pub async fn delete_file(&self, path: &str, namespace: Option<&str>) -> Result<String> {
        self.kubectl_with_namespace(
            vec!["delete", "--filename", path, "--ignore-not-found"],
            namespace,
        )
        .await
    }

    /// `kubectl apply --kustomize <dir> [--namespace ns]`
    pub async fn apply_kustomize(&self, dir: &str, namespace: Option<&str>) -> Result<String> {
        self.kubectl_with_namespace(vec!["apply", "--kustomize", dir], namespace)
            .await
    }

    /// `kubectl delete --kustomize <dir> --ignore-not-found [--namespace ns]`
    pub async fn delete_kustomize(&self, dir: &str, namespace: Option<&str>) -> Result<String> {
        self.kubectl_with_namespace(
            vec!["delete", "--kustomize", dir, "--ignore-not-found"],
            namespace,
        )
        .await
    }

    /// Apply manifest text through standard input
    pub async fn apply_content(&self, manifest: &str, namespace: Option<&str>) -> Result<String> {
        let mut args = vec!["apply".to_string(), "--filename".to_string(), "-".to_string()];
        push_namespace(&mut args, namespace);
        self.runner
            .run(&Invocation::new("kubectl").args(args).stdin(manifest))
            .await
    }

    /// Delete the objects of a manifest given as text
    pub async fn delete_content(&self, manifest: &str, namespace: Option<&str>) -> Result<String> {
        let mut args = vec![
            "delete".to_string(),
            "--filename".to_string(),
            "-".to_string(),
            "--ignore-not-found".to_string(),
        ];
        push_namespace(&mut args, namespace);
        self.runner
            .run(&Invocation::new("kubectl").args(args).stdin(manifest))
            .await
    }

    /// `kubectl wait --for=condition=<c> (--all|--selector=<s>) --timeout=<n>s [-n ns] <kind>`
    pub async fn wait_for(&self, wait: &KubectlWait) -> Result<String> {
        let mut args = vec![
            "wait".to_string(),
            format!("--for=condition={}", wait.condition),
        ];
        match &wait.selector {
            Some(selector) => args.push(format!("--selector={}", selector)),
            // a named resource cannot be combined with --all
            None if !wait.resource.contains('/') => args.push("--all".to_string()),
            None => {}
        }
        args.push(format!("--timeout={}s", wait.timeout.as_secs()));
        if let Some(ns) = wait.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            args.push("-n".to_string());
            args.push(ns.to_string());
        }
        args.push(wait.resource.clone());

        debug!(
            "Waiting for {} to be {} (timeout {:?})",
            wait.resource, wait.condition, wait.timeout
        );
        self.kubectl(args).await
    }

    /// Whether a deployed helm release named `release` exists
    pub async fn helm_release_deployed(&self, release: &str, namespace: Option<&str>) -> Result<bool> {
        let mut args = vec!["list".to_string()];
        push_namespace(&mut args, namespace);
        args.push("--deployed".to_string());
        args.push("-q".to_string());

        let out = self.runner.run(&Invocation::new("helm").args(args)).await?;
        Ok(out.lines().any(|line| line.trim() == release))
    }

    /// `helm install|upgrade <release> [--create-namespace] [--values v] [--namespace ns] --wait <chart>`
    pub async fn install_chart(&self, chart: &ChartInstall) -> Result<String> {
        let action = if chart.upgrade { "upgrade" } else { "install" };
        let mut args = vec![action.to_string(), chart.release.clone()];
        if chart.namespace.is_some() && !chart.upgrade {
            args.push("--create-namespace".to_string());
        }
        if let Some(values) = &chart.values {
            args.push("--values".to_string());
            args.push(values.clone());
        }
        for (key, value) in &chart.set {
            args.push("--set".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(ns) = &chart.namespace {
            args.push("--namespace".to_string());
            args.push(ns.clone());
        }
        args.push("--wait".to_string());
        args.push(chart.chart.clone());

        info!("Running helm {} for {}", action, chart.release);
        self.runner.run(&Invocation::new("helm").args(args)).await
    }

    /// `helm uninstall <release> [--namespace ns]`; a missing release is not an error
    pub async fn uninstall_chart(
        &self,
        release: &str,
        namespace: Option<&str>,
    ) -> Result<UninstallOutcome> {
        let mut args = vec!["uninstall".to_string(), release.to_string()];
        push_namespace(&mut args, namespace);

        match self.runner.run(&Invocation::new("helm").args(args)).await {
            Ok(_) => Ok(UninstallOutcome::Removed),
            Err(Error::ToolInvocation { output, .. }) if output.contains("release: not found") => {
                Ok(UninstallOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// Run `istioctl` with arbitrary arguments
    pub async fn istioctl<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String>,
    {
        self.runner.run(&Invocation::new("istioctl").args(args)).await
    }

    /// Execute a script with `cwd` as its working directory
    pub async fn run_script(&self, script: &Path, cwd: &Path) -> Result<String> {
        let program = script.to_string_lossy().into_owned();
        self.runner
            .run(&Invocation::new(program).current_dir(cwd))
            .await
    }

    async fn kubectl_with_namespace(&self, args: Vec<&str>, namespace: Option<&str>) -> Result<String> {
        let mut args: Vec<String> = args.into_iter().map(str::to_string).collect();
        push_namespace(&mut args, namespace);
        self.kubectl(args).await
    }
}

fn push_namespace(args: &mut Vec<String>, namespace: Option<&str>) {
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        args.push("--namespace".to_string());
        args.push(ns.to_string());
    }
}
