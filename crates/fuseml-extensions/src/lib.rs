//! FuseML extensions
//!
//! An extension is a directory in an extension repository holding a
//! `description.yaml` plus the charts, manifests and scripts it references.
//! This crate loads descriptions, orders extensions by their `requires`
//! lists, runs their install and uninstall steps, and announces installed
//! extensions to the registry in fuseml-core. [`ExtensionManager`] ties
//! these together for a set of requested extensions.

pub mod dependency;
pub mod descriptor;
pub mod executor;
pub mod manager;
pub mod registry;
pub mod source;

pub use dependency::{DependencyResolver, DescriptorLoader, RepositoryLoader};
pub use descriptor::{ExtensionDescriptor, InstallStep, StepType, DESCRIPTION_FILE};
pub use executor::Extension;
pub use manager::{ExtensionManager, ProgressCallback};
pub use registry::{register_extension, unregister_extension, RegisteredExtension, RegistryClient};
pub use source::{ExtensionSource, Repository};
