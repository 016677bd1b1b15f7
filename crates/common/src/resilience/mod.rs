//! Resilience patterns for fault tolerance
//!
//! The forwarder talks to two remote services that both fail transiently.
//! Instead of letting each call site hand-roll its own loop, every remote call
//! goes through a single bounded [`RetryExecutor`]:
//!
//! - **Retry budget**: a hard cap on attempts (`max_attempts`), never unbounded
//! - **Backoff**: capped exponential delays between attempts
//! - **Policy**: a [`RetryPolicy`] decides per error whether another attempt
//!   is worthwhile, so permanent failures stop immediately; it may also ask
//!   for a specific wait, such as a server's `Retry-After`
//!
//! Delays are awaited on the tokio timer, so a retrying call never busy-waits
//! and tests can drive it with paused time.

pub mod retry;

pub use retry::{
    ExponentialBackoff, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome,
    RetryPolicy, RetryResult,
};
