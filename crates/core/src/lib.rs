//! # AuditBridge Core
//!
//! Pure forwarding logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the source API, the sink and the clock
//! - Identity derivation and batch construction
//! - The source reader, delivery client and forwarding pipeline
//! - Window scheduling state for daemon mode
//!
//! ## Architecture Principles
//! - Only depends on `auditbridge-common` and `auditbridge-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits

pub mod forwarding;

pub use forwarding::batching::chunk;
pub use forwarding::delivery::DeliveryClient;
pub use forwarding::health::{ComponentHealth, HealthChecker, HealthReport};
pub use forwarding::identity::{derive, identify};
pub use forwarding::pipeline::{ForwardingPipeline, PreparedRun};
pub use forwarding::ports::{AuditLogSource, Clock, EventSink, SystemClock};
pub use forwarding::retry::{retry_config_for, TransientApiErrors};
pub use forwarding::schedule::{next_tick_delay, SchedulerState, WindowSchedule};
pub use forwarding::source_reader::{FetchedWindow, SourceReader};
