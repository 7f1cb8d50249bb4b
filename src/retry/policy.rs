//! Retry policy and executor
//!
//! Exponential backoff with optional jitter. Only errors reported as retryable by
//! `ImageError::is_retryable` are attempted again.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::defaults;
use crate::error::ImageError;
use crate::types::HttpSourceConfig;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
    /// Maximum jitter percentage (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: defaults::retry::RETRY_COUNT,
            initial_delay: defaults::retry::INITIAL_BACKOFF,
            max_delay: defaults::retry::MAX_BACKOFF,
            backoff_multiplier: defaults::retry::BACKOFF_MULTIPLIER,
            use_jitter: true,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy matching an HTTP source configuration.
    pub fn from_http_config(config: &HttpSourceConfig) -> Self {
        Self::default()
            .with_retry_count(config.retry_count)
            .with_initial_delay(config.initial_backoff)
            .with_max_delay(config.max_backoff)
            .with_jitter(config.use_jitter)
    }

    pub const fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Total attempts including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    pub fn should_retry(&self, error: &ImageError) -> bool {
        error.is_retryable()
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(retry as i32);

        let delay = Duration::from_millis(base_delay as u64).min(self.max_delay);

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        if jitter_range <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);

        let new_delay = delay.as_millis() as f64 + jitter;
        Duration::from_millis(new_delay.max(0.0) as u64)
    }
}

/// Runs an operation under a `RetryPolicy`.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an async operation with retry logic
    pub async fn execute<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T, ImageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ImageError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) if retry < self.policy.retry_count && self.policy.should_retry(&error) => {
                    let delay = self.policy.calculate_delay(retry);
                    warn!(target: "pic_prompt::retry", %what, attempt = retry + 1, ?delay, error = %error, "retrying");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Blocking counterpart of `execute`.
    pub fn execute_blocking<F, T>(&self, what: &str, mut operation: F) -> Result<T, ImageError>
    where
        F: FnMut() -> Result<T, ImageError>,
    {
        let mut retry = 0;
        loop {
            match operation() {
                Ok(result) => return Ok(result),
                Err(error) if retry < self.policy.retry_count && self.policy.should_retry(&error) => {
                    let delay = self.policy.calculate_delay(retry);
                    warn!(target: "pic_prompt::retry", %what, attempt = retry + 1, ?delay, error = %error, "retrying");
                    std::thread::sleep(delay);
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(retry_count: u32) -> RetryExecutor {
        RetryExecutor::new(
            RetryPolicy::new()
                .with_retry_count(retry_count)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    #[tokio::test]
    async fn test_retry_success_on_second_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fast(3)
            .execute("test", || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ImageError::fetch_failed("HTTP 503", Some(503), true))
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_retries_after_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), ImageError> = fast(2)
            .execute("test", || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ImageError::fetch_failed("timed out", None, true))
                }
            })
            .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let result: Result<(), ImageError> = fast(5).execute_blocking("test", || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ImageError::fetch_failed("HTTP 404", Some(404), false))
        });

        assert_eq!(result.unwrap_err().status_code(), Some(404));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_calculation() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(300));
        assert_eq!(policy.max_attempts(), 4);
    }
}
