//! Scheduling infrastructure for daemon mode
//!
//! The forward scheduler follows the runtime rules used across the crate:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Structured tracing for every tick

pub mod error;
pub mod forward_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use forward_scheduler::{DaemonSummary, ForwardScheduler, ForwardSchedulerConfig};
