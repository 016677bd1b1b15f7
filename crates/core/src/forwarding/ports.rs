//! Port interfaces for the forwarding pipeline
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use auditbridge_domain::{ApiError, AuditPage, Batch, PageRequest};
use chrono::{DateTime, Utc};

/// Trait for reading pages of audit records from the source API
#[async_trait]
pub trait AuditLogSource: Send + Sync {
    /// Fetch a single page. One call is one attempt; retries happen above.
    async fn fetch_page(&self, request: &PageRequest) -> Result<AuditPage, ApiError>;
}

/// Trait for transmitting batches to the ingest sink
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Send one batch as a single request.
    async fn send_batch(&self, batch: &Batch) -> Result<(), ApiError>;

    /// Query the sink's health endpoint
    async fn health_check(&self) -> Result<(), ApiError>;
}

/// Source of the current time, replaceable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
