//! Retry logic with exponential backoff
//!
//! Wraps a single fallible collaborator call. Transient failures (see
//! [`ProviderError::is_retryable`]) are retried with growing, optionally
//! jittered pauses; fatal failures are returned at once.

use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::error::ProviderError;
use crate::timing::{Sleeper, TokioSleeper};

/// Fraction of the delay used as the jitter half-width
pub const JITTER_FRACTION: f64 = 0.1;

/// Retry policy bound to a sleeper
///
/// Holds only immutable configuration, so one policy can be shared by every
/// concurrently running task. Jitter draws from the thread-local RNG.
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default(), Arc::new(TokioSleeper))
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Pre-jitter delay before retry number `attempt`
    ///
    /// `min(max_delay, base * exponential_base^(attempt - 1) * multiplier)`;
    /// attempt 0 (the first call) waits nothing.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.config.base_delay.as_secs_f64()
            * self.config.exponential_base.powi(exponent)
            * self.config.backoff_multiplier;

        let max = self.config.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            return self.config.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Delay actually slept before retry number `attempt`
    fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }

        let secs = delay.as_secs_f64();
        let spread = secs * JITTER_FRACTION;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((secs + offset).max(0.0))
    }

    /// Execute an async operation with retry logic
    ///
    /// # Arguments
    ///
    /// * `operation_name` - Name of the operation (for logging)
    /// * `operation` - Async operation to execute
    ///
    /// # Returns
    ///
    /// Result of the operation, or the last error once attempts run out or a
    /// fatal error is seen
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = self.jittered_delay(attempt);
                self.sleeper.sleep(delay).await;
            }

            debug!(
                "Attempt {}/{} for operation: {}",
                attempt + 1,
                max_attempts,
                operation_name
            );

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(
                            "Operation '{}' succeeded after {} retries",
                            operation_name, attempt
                        );
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(
                        "Operation '{}' failed with non-retryable error: {}",
                        operation_name, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        error!(
                            "Operation '{}' failed after {} attempts: {}",
                            operation_name, max_attempts, e
                        );
                        return Err(e);
                    }
                    warn!(
                        "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                        operation_name,
                        attempt,
                        max_attempts,
                        e,
                        self.backoff_delay(attempt)
                    );
                }
            }
        }
    }
}
