//! Error types for the condition-wait engine

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors that end a wait
///
/// Generic over `E`, the error type produced by the check or action.
#[derive(Debug)]
pub enum WaitError<E> {
    /// The deadline passed before the condition held
    Timeout {
        /// Time spent waiting
        elapsed: Duration,
        /// Error from the last attempt, for retrying waits
        last_error: Option<E>,
    },

    /// The check itself failed; polling does not continue past this
    Check(E),

    /// A fixed-attempt retry ran out of attempts
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        source: E,
    },
}

impl<E> WaitError<E> {
    /// Create a timeout error
    pub fn timeout(elapsed: Duration, last_error: Option<E>) -> Self {
        WaitError::Timeout {
            elapsed,
            last_error,
        }
    }

    /// Time spent before giving up, if the wait timed out
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            WaitError::Timeout { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

impl<E: fmt::Display> fmt::Display for WaitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout {
                elapsed,
                last_error,
            } => {
                if let Some(err) = last_error {
                    write!(
                        f,
                        "timed out after {:.0}s, last error: {}",
                        elapsed.as_secs_f64(),
                        err
                    )
                } else {
                    write!(f, "timed out after {:.0}s", elapsed.as_secs_f64())
                }
            }
            WaitError::Check(source) => write!(f, "check failed: {}", source),
            WaitError::Exhausted { attempts, source } => {
                write!(f, "gave up after {} attempts: {}", attempts, source)
            }
        }
    }
}

impl<E: Error + 'static> Error for WaitError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WaitError::Timeout {
                last_error: Some(err),
                ..
            } => Some(err),
            WaitError::Check(source) => Some(source),
            WaitError::Exhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<WaitError<crate::Error>> for crate::Error {
    fn from(err: WaitError<crate::Error>) -> Self {
        match err {
            WaitError::Timeout {
                elapsed,
                last_error,
            } => {
                let message = match last_error {
                    Some(last) => format!("last error: {}", last),
                    None => "condition not met".to_string(),
                };
                crate::Error::timeout(elapsed, message)
            }
            WaitError::Check(source) => source,
            WaitError::Exhausted { source, .. } => source,
        }
    }
}

impl WaitError<crate::Error> {
    /// Convert into the core error, naming what was being waited for on timeout
    pub fn into_error(self, waiting_for: impl Into<String>) -> crate::Error {
        match self {
            WaitError::Timeout { elapsed, .. } => crate::Error::timeout(elapsed, waiting_for),
            other => other.into(),
        }
    }
}
