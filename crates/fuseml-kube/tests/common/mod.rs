//! Common test utilities for fuseml-kube
//!
//! - In-memory cluster fake
//! - Command runner that records invocations and replays canned output

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;
