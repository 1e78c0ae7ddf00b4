//! Error types for fuseml-core

use std::time::Duration;
use thiserror::Error;

/// Result type alias using fuseml-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the FuseML installer
#[derive(Error, Debug)]
pub enum Error {
    /// An external tool exited with a non-zero status
    #[error("{command} failed:\n{output}")]
    ToolInvocation { command: String, output: String },

    /// A resource that was expected to exist does not
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// A wait ran out of time
    #[error("timed out after {:.0}s: {message}", .elapsed.as_secs_f64())]
    Timeout { elapsed: Duration, message: String },

    /// Extension description could not be read or parsed
    #[error("failed to load description of extension {extension}: {message}")]
    DescriptorParse { extension: String, message: String },

    /// Extension registry answered with an unexpected status
    #[error("unexpected response from extension registry ({status}): {body}")]
    RegistryProtocol { status: u16, body: String },

    /// Extension requirements form a cycle
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A reader supplied a value for an option nobody declared
    #[error("unknown installation option: {name}")]
    UnknownOption { name: String },

    /// Code asked for an option that was never declared
    #[error("installation option {name} is not declared")]
    UndeclaredOption { name: String },

    /// Option value does not match the declared type
    #[error("installation option {name} expects a value of type {expected}")]
    OptionType { name: String, expected: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a tool invocation error from the command line and its combined output
    pub fn tool_invocation(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed: Duration, message: impl Into<String>) -> Self {
        Self::Timeout {
            elapsed,
            message: message.into(),
        }
    }

    /// Create a descriptor parse error
    pub fn descriptor_parse(extension: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DescriptorParse {
            extension: extension.into(),
            message: message.into(),
        }
    }

    /// Create a registry protocol error
    pub fn registry_protocol(status: u16, body: impl Into<String>) -> Self {
        Self::RegistryProtocol {
            status,
            body: body.into(),
        }
    }

    /// Create a circular dependency error from the chain of names
    pub fn circular_dependency(chain: &[String]) -> Self {
        Self::CircularDependency {
            cycle: chain.join(" -> "),
        }
    }

    pub fn unknown_option(name: impl Into<String>) -> Self {
        Self::UnknownOption { name: name.into() }
    }

    pub fn undeclared_option(name: impl Into<String>) -> Self {
        Self::UndeclaredOption { name: name.into() }
    }

    pub fn option_type(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::OptionType {
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for a `Timeout` error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
