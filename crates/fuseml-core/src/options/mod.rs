//! Installation options
//!
//! A typed registry of named options consumed by every deployable unit.
//! Values are layered from several sources in increasing priority:
//! compiled defaults, interactive prompts, then command line flags. Each
//! layer is applied with [`InstallationOptions::populate`], which only
//! touches the options the source actually provides.
//!
//! An option may be scoped to a deployment id. Lookups with a deployment id
//! prefer the option scoped to that deployment and fall back to the
//! unscoped option of the same name.

mod reader;
mod value;

pub use reader::{DefaultOptionsReader, OptionsReader, ProvidedOption};
pub use value::{OptionType, OptionValue};

use tracing::debug;

use crate::error::{Error, Result};

/// A single named, typed installation option
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationOption {
    /// Unique key within its scope
    pub name: String,
    /// Help text, used for flags and prompts
    pub description: String,
    pub option_type: OptionType,
    pub default: OptionValue,
    /// Value set by a reader, `None` until populated
    pub value: Option<OptionValue>,
    /// Deployment this option is scoped to, `None` for global options
    pub deployment_id: Option<String>,
}

impl InstallationOption {
    /// Create an unscoped option; the type follows the default value
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<OptionValue>,
    ) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            description: description.into(),
            option_type: default.option_type(),
            default,
            value: None,
            deployment_id: None,
        }
    }

    /// Scope this option to one deployment
    pub fn scoped_to(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    /// Value in effect: the populated value, else the default
    pub fn effective(&self) -> &OptionValue {
        self.value.as_ref().unwrap_or(&self.default)
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    fn matches(&self, name: &str, deployment_id: Option<&str>) -> bool {
        self.name == name && self.deployment_id.as_deref() == deployment_id
    }

    /// Display key, `name` or `name@deployment`
    pub fn key(&self) -> String {
        match &self.deployment_id {
            Some(id) => format!("{}@{}", self.name, id),
            None => self.name.clone(),
        }
    }
}

/// Ordered registry of installation options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallationOptions {
    options: Vec<InstallationOption>,
}

impl InstallationOptions {
    /// Build a registry, rejecting duplicate names within a scope
    pub fn new(options: Vec<InstallationOption>) -> Result<Self> {
        let mut registry = Self::default();
        for option in options {
            registry.declare(option)?;
        }
        Ok(registry)
    }

    /// Add an option to the registry
    pub fn declare(&mut self, option: InstallationOption) -> Result<()> {
        if self.find(&option.name, option.deployment_id.as_deref()).is_some() {
            return Err(Error::config(format!(
                "installation option {} declared twice",
                option.key()
            )));
        }
        self.options.push(option);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstallationOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Apply the values a reader provides, leaving every other option untouched
    ///
    /// A provided name that is not declared, or a value of the wrong type,
    /// fails the whole call before anything is written.
    pub fn populate(&mut self, reader: &mut dyn OptionsReader) -> Result<()> {
        let provided = reader.read(self)?;

        let mut updates = Vec::with_capacity(provided.len());
        for item in provided {
            let index = self
                .position(&item.name, item.deployment_id.as_deref())
                .ok_or_else(|| Error::unknown_option(item.key()))?;
            let option = &self.options[index];
            if item.value.option_type() != option.option_type {
                return Err(Error::option_type(option.key(), option.option_type.to_string()));
            }
            updates.push((index, item.value));
        }

        for (index, value) in updates {
            debug!("Setting option {} = {}", self.options[index].key(), value);
            self.options[index].value = Some(value);
        }
        Ok(())
    }

    /// Set a single value, used when a value is discovered at runtime
    pub fn set(
        &mut self,
        name: &str,
        deployment_id: Option<&str>,
        value: impl Into<OptionValue>,
    ) -> Result<()> {
        let value = value.into();
        let index = self
            .position(name, deployment_id)
            .ok_or_else(|| Error::undeclared_option(name))?;
        let option = &mut self.options[index];
        if value.option_type() != option.option_type {
            return Err(Error::option_type(name, option.option_type.to_string()));
        }
        option.value = Some(value);
        Ok(())
    }

    /// Resolve an option for `deployment_id` (empty for the global scope)
    ///
    /// An option scoped to exactly that deployment wins; otherwise the
    /// unscoped option of the same name is used. An undeclared name is an error.
    pub fn get_opt(&self, name: &str, deployment_id: &str) -> Result<&InstallationOption> {
        if !deployment_id.is_empty() {
            if let Some(option) = self.find(name, Some(deployment_id)) {
                return Ok(option);
            }
        }
        self.find(name, None)
            .ok_or_else(|| Error::undeclared_option(name))
    }

    pub fn get_string(&self, name: &str, deployment_id: &str) -> Result<String> {
        let option = self.get_opt(name, deployment_id)?;
        option
            .effective()
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::option_type(name, OptionType::String.to_string()))
    }

    pub fn get_bool(&self, name: &str, deployment_id: &str) -> Result<bool> {
        let option = self.get_opt(name, deployment_id)?;
        option
            .effective()
            .as_bool()
            .ok_or_else(|| Error::option_type(name, OptionType::Bool.to_string()))
    }

    pub fn get_int(&self, name: &str, deployment_id: &str) -> Result<i64> {
        let option = self.get_opt(name, deployment_id)?;
        option
            .effective()
            .as_int()
            .ok_or_else(|| Error::option_type(name, OptionType::Int.to_string()))
    }

    pub fn get_list(&self, name: &str, deployment_id: &str) -> Result<Vec<String>> {
        let option = self.get_opt(name, deployment_id)?;
        option
            .effective()
            .as_list()
            .map(<[String]>::to_vec)
            .ok_or_else(|| Error::option_type(name, OptionType::List.to_string()))
    }

    /// Options visible to one deployment: global ones plus its own scoped ones
    pub fn for_deployment(&self, deployment_id: &str) -> InstallationOptions {
        InstallationOptions {
            options: self
                .options
                .iter()
                .filter(|o| match &o.deployment_id {
                    None => true,
                    Some(id) => id == deployment_id,
                })
                .cloned()
                .collect(),
        }
    }

    fn find(&self, name: &str, deployment_id: Option<&str>) -> Option<&InstallationOption> {
        self.options.iter().find(|o| o.matches(name, deployment_id))
    }

    fn position(&self, name: &str, deployment_id: Option<&str>) -> Option<usize> {
        self.options.iter().position(|o| o.matches(name, deployment_id))
    }
}
