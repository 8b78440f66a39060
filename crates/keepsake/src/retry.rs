//! Backoff for transient download failures.
//!
//! Platform calls are not retried here; a transient API failure aborts the
//! account's run and the next run resumes from the stored cursor. Media
//! downloads run once per item, so the fetcher wraps each one in
//! [`retry_while`].

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Exponential backoff policy for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub first_delay: Duration,
    pub ceiling: Duration,
    /// Attempts after the first one.
    pub retries: usize,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(1),
            ceiling: Duration::from_secs(30),
            retries: 3,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Millisecond delays without jitter.
    #[must_use]
    pub fn quick(retries: usize) -> Self {
        Self {
            first_delay: Duration::from_millis(1),
            ceiling: Duration::from_millis(4),
            retries,
            jitter: false,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn never() -> Self {
        Self {
            retries: 0,
            ..Self::quick(0)
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.first_delay)
            .with_max_delay(self.ceiling)
            .with_max_times(self.retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `attempt` until it succeeds, `should_retry` rejects its error, or the
/// policy is exhausted. `url` only labels the log lines.
pub async fn retry_while<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    attempt: F,
    should_retry: P,
    url: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error,
    P: Fn(&E) -> bool,
{
    attempt
        .retry(policy.backoff())
        .when(should_retry)
        .notify(|err, delay| {
            tracing::debug!(
                url,
                ?delay,
                error = %crate::platform::short_error_message(err),
                "media download failed, retrying"
            );
        })
        .await
}
