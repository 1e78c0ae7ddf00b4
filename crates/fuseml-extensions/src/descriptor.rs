//! Extension description file (`description.yaml`)
//!
//! Keys are matched case-insensitively (`waitfor`, `waitFor` and `WaitFor`
//! are the same key); snake_case spellings are accepted as well. Keys of
//! `configuration` maps are data and keep their case. Types that are also
//! sent to the extension registry serialize with snake_case keys.

use std::collections::BTreeMap;
use std::fmt;

use fuseml_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};

/// Name of the description file inside an extension directory
pub const DESCRIPTION_FILE: &str = "description.yaml";

/// Parsed `description.yaml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub product: String,
    pub version: String,
    pub description: String,
    /// Namespace owned by the extension, empty when it has none
    pub namespace: String,
    pub zone: String,
    /// Extensions that must be installed first
    pub requires: Vec<String>,
    pub install: Vec<InstallStep>,
    pub uninstall: Vec<InstallStep>,
    pub gateways: Vec<GatewaySpec>,
    pub services: Vec<ServiceSpec>,
    #[serde(rename = "servicecredentials", alias = "service_credentials")]
    pub service_credentials: Vec<ServiceCredentialTemplate>,
}

impl ExtensionDescriptor {
    /// Parse a description, attributing failures to `extension`
    pub fn from_yaml(extension: &str, content: &str) -> Result<Self> {
        let parse_error = |e: serde_yaml_ng::Error| Error::descriptor_parse(extension, e.to_string());

        let mut value: Value = serde_yaml_ng::from_str(content).map_err(parse_error)?;
        if value.is_null() {
            value = Value::Mapping(Mapping::new());
        }
        lowercase_keys(&mut value);
        serde_yaml_ng::from_value(value).map_err(parse_error)
    }
}

/// Lowercase every mapping key except inside `configuration` maps
fn lowercase_keys(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (key, mut inner) in std::mem::take(map) {
                let key = match key {
                    Value::String(name) => {
                        let name = name.to_lowercase();
                        if name != "configuration" {
                            lowercase_keys(&mut inner);
                        }
                        Value::String(name)
                    }
                    other => {
                        lowercase_keys(&mut inner);
                        other
                    }
                };
                map.insert(key, inner);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(lowercase_keys),
        _ => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Helm,
    Manifest,
    Kustomize,
    Script,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepType::Helm => "helm",
            StepType::Manifest => "manifest",
            StepType::Kustomize => "kustomize",
            StepType::Script => "script",
        };
        f.write_str(name)
    }
}

/// One install or uninstall action
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstallStep {
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Chart, manifest, kustomize directory or script
    pub location: String,
    /// Helm values file
    #[serde(default)]
    pub values: String,
    /// Namespace for this step only; the extension namespace when empty
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "waitfor", alias = "wait_for")]
    pub wait_for: Vec<WaitCondition>,
}

/// Condition checked with `kubectl wait` after a step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaitCondition {
    pub kind: String,
    pub namespace: String,
    pub condition: String,
    /// Label selector, or `all`
    pub selector: String,
    /// Seconds; the extension timeout when unset
    pub timeout: Option<u64>,
}

impl Default for WaitCondition {
    fn default() -> Self {
        Self {
            kind: "pod".to_string(),
            namespace: String::new(),
            condition: "Ready".to_string(),
            selector: "all".to_string(),
            timeout: None,
        }
    }
}

/// Host under the system domain routed to an extension service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewaySpec {
    pub namespace: String,
    pub name: String,
    pub port: u16,
    #[serde(rename = "servicehost", alias = "service_host")]
    pub service_host: String,
}

/// A service offered by an extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    pub id: String,
    pub resource: String,
    pub category: String,
    pub description: String,
    #[serde(rename = "auth_required", alias = "authrequired")]
    pub auth_required: bool,
    pub endpoints: Vec<Endpoint>,
    pub credentials: Vec<Credential>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub url: String,
    /// `internal` or `external`
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub configuration: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    pub id: String,
    pub default: bool,
    pub scope: String,
    pub projects: Vec<String>,
    pub users: Vec<String>,
    pub configuration: BTreeMap<String, String>,
}

/// How to fill credential configuration from cluster secrets
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceCredentialTemplate {
    #[serde(rename = "serviceid", alias = "service_id")]
    pub service_id: String,
    pub credentials: Vec<CredentialTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialTemplate {
    pub id: String,
    pub transform: Vec<CredentialTransform>,
}

/// Copies `secret[secret_value]` into `configuration[config_value]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialTransform {
    #[serde(rename = "configvalue", alias = "config_value")]
    pub config_value: String,
    #[serde(rename = "secretvalue", alias = "secret_value")]
    pub secret_value: String,
    pub secret: String,
    pub namespace: String,
}
