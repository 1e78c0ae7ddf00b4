//! Extension dependency resolution using DFS post-order

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use fuseml_core::{Error, Result, WORKLOADS_NAMESPACE};
use tracing::debug;

use crate::executor::Extension;

/// Source of extension descriptions, by name
#[async_trait]
pub trait DescriptorLoader: Send + Sync {
    async fn load(&self, name: &str) -> Result<Extension>;
}

/// Loads descriptions from an extension repository
pub struct RepositoryLoader {
    repository: String,
    timeout: Duration,
    workloads_namespace: String,
}

impl RepositoryLoader {
    pub fn new(repository: impl Into<String>, timeout: Duration) -> Self {
        Self {
            repository: repository.into(),
            timeout,
            workloads_namespace: WORKLOADS_NAMESPACE.to_string(),
        }
    }

    /// Workloads namespace handed to every loaded extension
    pub fn with_workloads_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.workloads_namespace = namespace.into();
        self
    }
}

#[async_trait]
impl DescriptorLoader for RepositoryLoader {
    async fn load(&self, name: &str) -> Result<Extension> {
        Ok(Extension::load(name, &self.repository, self.timeout)
            .await?
            .with_workloads_namespace(&self.workloads_namespace))
    }
}

/// Orders extensions so that requirements come before the extensions needing them
pub struct DependencyResolver {
    extensions: HashMap<String, Extension>,
}

impl DependencyResolver {
    /// Load the requested extensions and, transitively, everything they require
    pub async fn load(loader: &dyn DescriptorLoader, names: &[String]) -> anyhow::Result<Self> {
        let mut extensions: HashMap<String, Extension> = HashMap::new();
        let mut pending: VecDeque<(String, Option<String>)> =
            names.iter().map(|name| (name.clone(), None)).collect();

        while let Some((name, required_by)) = pending.pop_front() {
            if extensions.contains_key(&name) {
                continue;
            }
            let extension = match &required_by {
                None => loader
                    .load(&name)
                    .await
                    .with_context(|| format!("Failed to load extension {}", name))?,
                Some(parent) => loader.load(&name).await.with_context(|| {
                    format!(
                        "Failed to load extension {}, required by extension {}",
                        name, parent
                    )
                })?,
            };
            for required in extension.requires() {
                if !extensions.contains_key(required) {
                    pending.push_back((required.clone(), Some(name.clone())));
                }
            }
            extensions.insert(name, extension);
        }

        debug!("Loaded {} extension descriptions", extensions.len());
        Ok(Self { extensions })
    }

    /// Load only the named extensions, ignoring their requirements
    pub async fn load_only(loader: &dyn DescriptorLoader, names: &[String]) -> anyhow::Result<Self> {
        let mut extensions = HashMap::new();
        for name in names {
            let extension = loader
                .load(name)
                .await
                .with_context(|| format!("Failed to load extension {}", name))?;
            extensions.insert(name.clone(), extension);
        }
        Ok(Self { extensions })
    }

    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.extensions.get(name)
    }

    /// Requirements first, each extension once
    pub fn install_order(&self, names: &[String]) -> Result<Vec<&Extension>> {
        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        let mut visiting = Vec::new();

        for name in names {
            self.visit(name, &mut resolved, &mut seen, &mut visiting)?;
        }
        Ok(resolved)
    }

    /// The reverse of [`Self::install_order`], or just the named extensions
    /// when dependencies stay installed
    pub fn uninstall_order(&self, names: &[String], with_dependencies: bool) -> Result<Vec<&Extension>> {
        if !with_dependencies {
            let mut seen = HashSet::new();
            return names
                .iter()
                .filter(|name| seen.insert(*name))
                .map(|name| {
                    self.extensions
                        .get(name)
                        .ok_or_else(|| Error::not_found("extension", name.as_str()))
                })
                .collect();
        }

        let mut order = self.install_order(names)?;
        order.reverse();
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        resolved: &mut Vec<&'a Extension>,
        seen: &mut HashSet<String>,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        // Cycle detection
        if let Some(start) = visiting.iter().position(|v| v == name) {
            let mut cycle = visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(Error::circular_dependency(&cycle));
        }

        if seen.contains(name) {
            return Ok(());
        }

        let extension = self
            .extensions
            .get(name)
            .ok_or_else(|| Error::not_found("extension", name))?;

        visiting.push(name.to_string());
        for required in extension.requires() {
            self.visit(required, resolved, seen, visiting)?;
        }
        visiting.pop();

        seen.insert(name.to_string());
        resolved.push(extension);
        Ok(())
    }
}
