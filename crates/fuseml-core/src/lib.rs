//! FuseML Core Library
//!
//! Shared building blocks for the FuseML installer:
//! - Error taxonomy shared by every crate
//! - Condition-wait engine used for all polling
//! - Typed installation options and their sources
//! - Local CLI configuration file

pub mod config;
pub mod error;
pub mod options;
pub mod wait;

pub use error::{Error, Result};

/// Default timeout, in seconds, for component and extension operations
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Namespace shared by platform workloads; never deleted on extension removal
pub const WORKLOADS_NAMESPACE: &str = "fuseml-workloads";
