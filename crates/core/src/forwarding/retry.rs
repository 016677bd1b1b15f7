//! Retry policy shared by page fetches and batch deliveries

use auditbridge_common::{RetryConfig, RetryDecision, RetryError, RetryPolicy};
use auditbridge_domain::{ApiError, ForwardingConfig};

/// Retries errors whose category is transient (timeouts, connection
/// failures, 5xx, 429) and stops on everything else. A 429 with a
/// `Retry-After` hint waits for the hinted delay instead of the backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientApiErrors;

impl RetryPolicy<ApiError> for TransientApiErrors {
    fn should_retry(&self, error: &ApiError, _attempt: u32) -> RetryDecision {
        if !error.should_retry() {
            return RetryDecision::Stop;
        }
        match error.retry_after() {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::Retry,
        }
    }
}

/// `max_retries` retries on top of the first attempt, exponential backoff.
pub fn retry_config_for(forwarding: &ForwardingConfig) -> RetryConfig {
    RetryConfig::with_max_retries(
        forwarding.max_retries,
        forwarding.base_backoff(),
        forwarding.max_backoff(),
    )
}

/// Flatten a retry failure into the last transport error.
pub(crate) fn last_api_error(err: RetryError<ApiError>) -> (u32, ApiError) {
    let attempts = err.attempts();
    let message = err.to_string();
    let error = err.into_last_error().unwrap_or(ApiError::Config(message));
    (attempts, error)
}
