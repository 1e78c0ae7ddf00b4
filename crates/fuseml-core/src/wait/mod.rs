//! Condition-wait engine
//!
//! Every polling loop in the installer goes through this module so that
//! timeouts behave the same everywhere:
//!
//! - [`wait_until_exists`] / [`wait_until_gone`] poll a boolean check at a
//!   fixed one second interval; a check error ends the wait immediately.
//! - [`run_to_success_with_timeout`] retries a fallible action until it
//!   succeeds or the deadline passes.
//! - [`retry_with_backoff`] retries a fixed number of times with a delay
//!   that grows after every failed attempt.
//!
//! Waits block the calling sequence. The deadline is the only way out: a
//! timeout is never reported before the configured duration and at most one
//! interval after it.

mod backoff;
mod engine;
mod error;


pub use backoff::{retry_with_backoff, Backoff};
pub use engine::{
    poll_until, run_to_success_with_timeout, wait_until_exists, wait_until_gone, POLL_INTERVAL,
};
pub use error::WaitError;
