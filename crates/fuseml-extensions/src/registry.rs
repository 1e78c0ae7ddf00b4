//! Client for the extension registry served by fuseml-core
//!
//! Endpoints:
//! - `GET /extensions/{id}`: 200 when registered, 404 when not
//! - `POST /extensions`: 201 on success
//! - `DELETE /extensions/{id}`: 204, or 404 when already gone
//! - `GET /extensions`: every registered extension
//!
//! Any other status is reported as [`Error::RegistryProtocol`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use fuseml_core::Error;
use fuseml_deployments::components::CORE_DEPLOYMENT_ID;
use fuseml_kube::Cluster;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::descriptor::ServiceSpec;
use crate::executor::Extension;

/// Extension as stored by the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisteredExtension {
    pub id: String,
    pub product: String,
    pub version: String,
    pub description: String,
    pub zone: String,
    pub configuration: BTreeMap<String, String>,
    /// Filled in by the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RegistrationStatus>,
    pub services: Vec<ServiceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationStatus {
    pub registered: String,
    pub updated: String,
}

/// HTTP client for the extension registry
pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Registry of the FuseML instance reachable under `system_domain`
    pub fn for_domain(system_domain: &str) -> Result<Self> {
        Self::new(format!("http://{}.{}", CORE_DEPLOYMENT_ID, system_domain))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn extension_url(&self, id: &str) -> String {
        format!("{}/extensions/{}", self.base_url, id)
    }

    pub async fn is_registered(&self, id: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.extension_url(id))
            .send()
            .await
            .with_context(|| format!("Failed to query extension registry for {}", id))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(protocol_error(response).await),
        }
    }

    pub async fn register(&self, extension: &RegisteredExtension) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/extensions", self.base_url))
            .json(extension)
            .send()
            .await
            .with_context(|| format!("Failed to register extension {}", extension.id))?;

        if response.status() == StatusCode::CREATED {
            return Ok(());
        }
        Err(protocol_error(response)
            .await
            .context("Failed registering the extension"))
    }

    /// Remove a registration; `false` when it was not registered
    pub async fn unregister(&self, id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.extension_url(id))
            .send()
            .await
            .with_context(|| format!("Failed to unregister extension {}", id))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(protocol_error(response).await),
        }
    }

    pub async fn list(&self) -> Result<Vec<RegisteredExtension>> {
        let response = self
            .client
            .get(format!("{}/extensions", self.base_url))
            .send()
            .await
            .context("Failed to list registered extensions")?;

        if response.status() != StatusCode::OK {
            return Err(protocol_error(response).await);
        }
        response
            .json()
            .await
            .context("Failed to parse registered extensions")
    }
}

async fn protocol_error(response: reqwest::Response) -> anyhow::Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::registry_protocol(status, body).into()
}

/// Registration payload for an extension
///
/// Credential configuration is overlaid with values read from cluster
/// secrets as described by the `servicecredentials` section. A key missing
/// from a secret yields an empty value.
pub async fn build_payload(
    extension: &Extension,
    cluster: &dyn Cluster,
) -> fuseml_core::Result<RegisteredExtension> {
    let desc = &extension.descriptor;

    let mut transformed: HashMap<(String, String), BTreeMap<String, String>> = HashMap::new();
    for template in &desc.service_credentials {
        for credential in &template.credentials {
            let values = transformed
                .entry((template.service_id.clone(), credential.id.clone()))
                .or_default();
            for transform in &credential.transform {
                let secret = cluster
                    .get_secret(&transform.namespace, &transform.secret)
                    .await?;
                let value = secret
                    .get(&transform.secret_value)
                    .cloned()
                    .unwrap_or_default();
                values.insert(transform.config_value.clone(), value);
            }
        }
    }

    let mut services = desc.services.clone();
    for service in &mut services {
        for credential in &mut service.credentials {
            let key = (service.id.clone(), credential.id.clone());
            if let Some(values) = transformed.get(&key) {
                credential.configuration.extend(values.clone());
            }
        }
    }

    Ok(RegisteredExtension {
        id: extension.name.clone(),
        product: desc.product.clone(),
        version: desc.version.clone(),
        description: desc.description.clone(),
        zone: desc.zone.clone(),
        configuration: BTreeMap::new(),
        status: None,
        services,
    })
}

/// Register an extension unless it already is; `false` when nothing was sent
pub async fn register_extension(
    client: &RegistryClient,
    extension: &Extension,
    cluster: &dyn Cluster,
) -> Result<bool> {
    if client.is_registered(&extension.name).await? {
        warn!(
            "Extension {} is already registered; if you want to update it, delete it first",
            extension.name
        );
        return Ok(false);
    }

    let payload = build_payload(extension, cluster)
        .await
        .context("Failed to transform values for credentials")?;
    debug!("Registering extension {} at {}", extension.name, client.base_url());
    client.register(&payload).await?;
    info!("Extension {} registered", extension.name);
    Ok(true)
}

/// Remove an extension's registration, tolerating its absence
pub async fn unregister_extension(client: &RegistryClient, name: &str) -> Result<()> {
    if client.unregister(name).await? {
        info!("Extension {} unregistered", name);
    } else {
        debug!("Extension {} was not registered", name);
    }
    Ok(())
}
