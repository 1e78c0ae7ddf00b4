//! Option sources

use super::{InstallationOptions, OptionValue};
use crate::error::Result;

/// A value supplied by an options source
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidedOption {
    pub name: String,
    pub deployment_id: Option<String>,
    pub value: OptionValue,
}

impl ProvidedOption {
    /// Value for the global option `name`
    pub fn new(name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self {
            name: name.into(),
            deployment_id: None,
            value: value.into(),
        }
    }

    /// Value for the option `name` scoped to `deployment_id`
    pub fn scoped(
        name: impl Into<String>,
        deployment_id: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Self {
        Self {
            name: name.into(),
            deployment_id: Some(deployment_id.into()),
            value: value.into(),
        }
    }

    pub(crate) fn key(&self) -> String {
        match &self.deployment_id {
            Some(id) => format!("{}@{}", self.name, id),
            None => self.name.clone(),
        }
    }
}

/// A source of installation option values
///
/// Implementations return only the values they actually have; anything not
/// returned keeps its current value.
pub trait OptionsReader {
    fn read(&mut self, options: &InstallationOptions) -> Result<Vec<ProvidedOption>>;
}

/// Lowest layer: every option set to its compiled default
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOptionsReader;

impl OptionsReader for DefaultOptionsReader {
    fn read(&mut self, options: &InstallationOptions) -> Result<Vec<ProvidedOption>> {
        Ok(options
            .iter()
            .map(|o| ProvidedOption {
                name: o.name.clone(),
                deployment_id: o.deployment_id.clone(),
                value: o.default.clone(),
            })
            .collect())
    }
}
