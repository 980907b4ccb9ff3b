use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};

/// Fibonacci backoff with an upper bound on the delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    fib: (Duration, Duration),
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            fib: (initial_delay, initial_delay),
        }
    }

    /// Returns the next delay, never more than `max_delay`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.fib.0.min(self.max_delay);
        self.fib = (self.fib.1, (self.fib.0 + self.fib.1).min(self.max_delay));
        delay
    }

    /// Starts over from the initial delay.
    pub fn reset(&mut self) {
        self.fib = (self.initial_delay, self.initial_delay);
    }
}

/// Pacing of batch resubmissions.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Time spent waiting without a single item getting through before
    /// giving up.
    pub stall_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            stall_timeout: Duration::from_secs(600),
        }
    }
}

/// What the service did with one submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// Accepted, except for the requests handed back.
    Unprocessed(Vec<T>),
    /// Rejected as a whole by throttling.
    Throttled,
}

/// Submits `pending` until the service has accepted every request.
///
/// The backoff starts over whenever a submission gets at least one request
/// through, so a throttled but progressing batch is retried for as long as
/// it takes. Only `stall_timeout` worth of waiting without progress fails
/// with [`ServiceError::UnprocessedItems`].
pub async fn resubmit_until_written<T, F, Fut>(
    table: &str,
    mut pending: Vec<T>,
    settings: RetrySettings,
    mut submit: F,
) -> ServiceResult<()>
where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = ServiceResult<Submission<T>>>,
{
    let mut backoff = Backoff::new(settings.initial_delay, settings.max_delay);
    let mut stalled = Duration::ZERO;

    while !pending.is_empty() {
        let submitted = pending.len();
        match submit(pending.clone()).await? {
            Submission::Unprocessed(rest) => pending = rest,
            Submission::Throttled => debug!("Batch of {submitted} requests on '{table}' throttled"),
        }
        if pending.is_empty() {
            break;
        }

        if pending.len() < submitted {
            backoff.reset();
            stalled = Duration::ZERO;
        } else if stalled >= settings.stall_timeout {
            return Err(ServiceError::UnprocessedItems {
                table: table.to_string(),
                remaining: pending.len(),
                stalled,
            });
        }

        let delay = backoff.next_delay();
        warn!(
            "Retrying {} unprocessed items on '{table}' in {:?}",
            pending.len(),
            delay
        );
        sleep(delay).await;
        stalled += delay;
    }
    Ok(())
}

/// Calls `check` every `interval` until it yields `Some`, giving up after
/// `max_attempts` calls.
///
/// Errors from `check` end the polling immediately.
pub async fn poll_until<T, E, Fut, F>(
    mut check: F,
    interval: Duration,
    max_attempts: usize,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        if attempt < max_attempts {
            debug!(
                "Condition not met yet, polling again in {:?} (attempt {}/{})",
                interval, attempt, max_attempts
            );
            sleep(interval).await;
        }
    }
    Ok(None)
}
