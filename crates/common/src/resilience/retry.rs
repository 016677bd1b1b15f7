//! Bounded retry execution with capped exponential backoff
//!
//! A [`RetryExecutor`] runs an async operation until it succeeds, the
//! [`RetryPolicy`] refuses another attempt, or the attempt budget runs out.
//! A policy may ask for a specific wait (a server's `Retry-After`); that wait
//! is capped at the backoff's `max_delay`.
//! Unlike a plain loop the executor always hands the *last* error back to the
//! caller, so callers can classify the final failure without re-running the
//! operation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All attempts allowed by the configuration failed
    #[error("All {attempts} attempt(s) exhausted; last error: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// The policy refused to retry the error
    #[error("Operation failed with non-retryable error after {attempts} attempt(s): {error}")]
    NonRetryable { attempts: u32, error: E },

    /// The retry configuration is invalid
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// Number of attempts that were made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => *attempts,
            Self::InvalidConfiguration { .. } => 0,
        }
    }

    /// The final error produced by the operation, if any attempt ran.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::NonRetryable { error, .. } => Some(error),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including the attempt count.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide whether `error`, produced by the zero-based `attempt`, should be
    /// retried.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the configured backoff delay
    Retry,
    /// Retry the operation after a specific delay, capped at `max_delay`
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Exponential backoff: `initial_delay * 2^retry`, capped at `max_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ExponentialBackoff {
    /// Delay to wait before retry number `retry` (zero-based).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let multiplier = 1u32 << retry.min(16);
        self.initial_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// A policy-requested wait, held to the same ceiling.
    pub fn cap(&self, requested: Duration) -> Duration {
        requested.min(self.max_delay)
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts (initial try + retries)
    pub max_attempts: u32,
    /// Delays between attempts
    pub backoff: ExponentialBackoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: ExponentialBackoff {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(30),
            },
        }
    }
}

impl RetryConfig {
    /// Build a configuration expressed as "initial attempt plus `max_retries`
    /// retries" with capped exponential backoff.
    pub fn with_max_retries(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            backoff: ExponentialBackoff { initial_delay, max_delay },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return attempt statistics.
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(err) = self.config.validate() {
            // `RetryError<()>` has no `Display` (`()` is not `Display`);
            // render the same text the derived `Display` would produce.
            let message = match err {
                RetryError::InvalidConfiguration { message } => {
                    format!("Invalid retry configuration: {message}")
                }
                other => format!("{other:?}"),
            };
            return RetryOutcome {
                result: Err(RetryError::InvalidConfiguration { message }),
                attempts: 0,
                total_delay: Duration::ZERO,
            };
        }

        let max_attempts = self.config.max_attempts;
        let mut total_delay = Duration::ZERO;
        let mut attempt: u32 = 0;

        loop {
            let attempt_number = attempt + 1;
            debug!(attempt = attempt_number, max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt_number, total_delay };
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt = attempt_number, error = %error, "error is not retryable");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts: attempt_number, error }),
                        attempts: attempt_number,
                        total_delay,
                    };
                }
                RetryDecision::Retry => self.config.backoff.calculate_delay(attempt),
                RetryDecision::RetryAfter(requested) => self.config.backoff.cap(requested),
            };

            if attempt_number >= max_attempts {
                warn!(attempts = attempt_number, error = %error, "retry attempts exhausted");
                return RetryOutcome {
                    result: Err(RetryError::Exhausted { attempts: attempt_number, last_error: error }),
                    attempts: attempt_number,
                    total_delay,
                };
            }

            warn!(
                attempt = attempt_number,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "operation failed, retrying"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            total_delay += delay;
            attempt += 1;
        }
    }
}
