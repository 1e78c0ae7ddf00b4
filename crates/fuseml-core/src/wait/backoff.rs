//! Fixed-attempt retry with growing delay

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use super::error::WaitError;

/// Attempt count and delay progression for [`retry_with_backoff`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Factor applied to the delay after every retry
    pub multiplier: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(3),
            multiplier: 2,
        }
    }
}

impl Backoff {
    /// Delay to sleep before attempt number `attempt` (1-based)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.saturating_pow(attempt - 2);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `action` up to `backoff.attempts` times
pub async fn retry_with_backoff<F, Fut, T, E>(
    backoff: &Backoff,
    mut action: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = backoff.attempts.max(1);
    let mut attempt = 1;

    loop {
        let delay = backoff.delay_before(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(WaitError::Exhausted {
                    attempts,
                    source: err,
                });
            }
            Err(err) => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, err);
                attempt += 1;
            }
        }
    }
}
