//! Polling loops

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use super::error::WaitError;

/// Interval used by the existence waits
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `check` every `interval` until it returns `Ok(true)`
///
/// A check error is permanent and ends the wait. When the deadline passes the
/// check is not called again and `WaitError::Timeout` carries the elapsed time.
pub async fn poll_until<F, Fut, E>(
    mut check: F,
    timeout: Duration,
    interval: Duration,
) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        match check().await {
            Ok(true) => {
                debug!("Condition met after {} polls", polls);
                return Ok(());
            }
            Ok(false) => {}
            Err(err) => return Err(WaitError::Check(err)),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(WaitError::timeout(elapsed, None));
        }

        trace!("Condition not met yet, poll {}", polls);
        sleep(interval.min(timeout - elapsed)).await;
    }
}

/// Wait until `check` reports that a resource exists
pub async fn wait_until_exists<F, Fut, E>(check: F, timeout: Duration) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    poll_until(check, timeout, POLL_INTERVAL).await
}

/// Wait until `check` reports that a resource no longer exists
pub async fn wait_until_gone<F, Fut, E>(mut check: F, timeout: Duration) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    poll_until(
        || {
            let fut = check();
            async move { fut.await.map(|exists| !exists) }
        },
        timeout,
        POLL_INTERVAL,
    )
    .await
}

/// Run `action` until it succeeds, sleeping `interval` between failures
///
/// Returns the first successful value. Once `timeout` has elapsed the last
/// error is handed back inside `WaitError::Timeout`.
pub async fn run_to_success_with_timeout<F, Fut, T, E>(
    mut action: F,
    timeout: Duration,
    interval: Duration,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();

    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Err(WaitError::timeout(elapsed, Some(err)));
                }
                debug!("Retrying in {:?}: {}", interval, err);
                sleep(interval.min(timeout - elapsed)).await;
            }
        }
    }
}
