//! FuseML platform deployments
//!
//! The platform is made of six components, each behind the [`Deployment`]
//! trait:
//! - istio: service mesh and ingress gateway
//! - fuseml-workloads: namespace for pipelines and served models
//! - gitea: source control
//! - fuseml-registry: container image registry
//! - tekton-pipelines: CI pipelines
//! - fuseml-core: the FuseML API
//!
//! [`Sequencer`] runs them in order and fills in the system domain once the
//! mesh is up. Manifests ship embedded in the binary.

pub mod assets;
pub mod components;
pub mod deployment;
pub mod domain;
pub mod gateway;
pub mod options;
pub mod sequencer;

pub use deployment::Deployment;
pub use gateway::{create_istio_gateway, expose, Route};
pub use sequencer::{PlatformConfig, Sequencer};
