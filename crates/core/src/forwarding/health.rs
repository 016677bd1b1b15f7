//! Reachability checks for the source and the sink

use std::sync::Arc;

use auditbridge_domain::{PageRequest, TimeWindow};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::ports::{AuditLogSource, Clock, EventSink};

/// Health of one remote dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn up(name: &'static str) -> Self {
        Self { name, healthy: true, detail: None }
    }

    fn down(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, healthy: false, detail: Some(detail.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub source: ComponentHealth,
    pub sink: ComponentHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.source.healthy && self.sink.healthy
    }
}

/// Checks both sides once, without retries.
pub struct HealthChecker {
    source: Arc<dyn AuditLogSource>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    organization_id: String,
}

impl HealthChecker {
    pub fn new(
        source: Arc<dyn AuditLogSource>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self { source, sink, clock, organization_id: organization_id.into() }
    }

    #[instrument(skip(self))]
    pub async fn check(&self) -> HealthReport {
        let report = HealthReport { source: self.check_source().await, sink: self.check_sink().await };
        if report.is_healthy() {
            info!("source and sink are reachable");
        } else {
            warn!(source = report.source.healthy, sink = report.sink.healthy, "health check failed");
        }
        report
    }

    /// One single-record page over the last hour.
    async fn check_source(&self) -> ComponentHealth {
        let window = match TimeWindow::ending_at(self.clock.now(), chrono::Duration::hours(1)) {
            Ok(window) => window,
            Err(err) => return ComponentHealth::down("source", err.to_string()),
        };
        let request = PageRequest {
            organization_id: self.organization_id.clone(),
            window,
            limit: 1,
            page_token: None,
        };
        match self.source.fetch_page(&request).await {
            Ok(_) => ComponentHealth::up("source"),
            Err(err) => ComponentHealth::down("source", err.to_string()),
        }
    }

    async fn check_sink(&self) -> ComponentHealth {
        match self.sink.health_check().await {
            Ok(()) => ComponentHealth::up("sink"),
            Err(err) => ComponentHealth::down("sink", err.to_string()),
        }
    }
}
