//! Shared fakes for the infrastructure integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use auditbridge_common::RetryConfig;
use auditbridge_core::{AuditLogSource, Clock, DeliveryClient, EventSink, ForwardingPipeline, SourceReader};
use auditbridge_domain::{ApiError, AuditPage, AuditRecord, Batch, PageRequest, TimeWindow};
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

/// Wall-clock time derived from tokio's (pausable) clock.
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl TokioClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self { origin, started: Instant::now() }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::from_std(self.started.elapsed()).expect("elapsed fits")
    }
}

pub fn origin() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn at_offset(secs: i64) -> DateTime<Utc> {
    origin() + chrono::Duration::seconds(secs)
}

/// Source returning one record at the end of every requested window.
#[derive(Default)]
pub struct RecordingSource {
    windows: Mutex<Vec<TimeWindow>>,
    failures: Mutex<VecDeque<ApiError>>,
    latency: Option<Duration>,
}

impl RecordingSource {
    pub fn failing_first(errors: Vec<ApiError>) -> Self {
        Self { failures: Mutex::new(errors.into()), ..Self::default() }
    }

    pub fn slow(latency: Duration) -> Self {
        Self { latency: Some(latency), ..Self::default() }
    }

    pub fn windows(&self) -> Vec<TimeWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogSource for RecordingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<AuditPage, ApiError> {
        self.windows.lock().unwrap().push(request.window);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let record = AuditRecord::new(
            (request.window.end() - chrono::Duration::seconds(1)).to_rfc3339(),
            "user-1",
            "UPDATE",
            "vm",
            request.organization_id.clone(),
        );
        Ok(AuditPage { items: vec![record], next_token: None })
    }
}

/// Sink accepting every batch.
#[derive(Default)]
pub struct CollectingSink {
    pub batches: Mutex<Vec<Batch>>,
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn send_batch(&self, batch: &Batch) -> Result<(), ApiError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

pub fn fast_retries() -> RetryConfig {
    RetryConfig::with_max_retries(3, Duration::from_millis(10), Duration::from_millis(100))
}

pub fn pipeline(
    source: Arc<dyn AuditLogSource>,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
) -> Arc<ForwardingPipeline> {
    Arc::new(ForwardingPipeline::new(
        SourceReader::new(source, fast_retries()),
        DeliveryClient::new(sink, fast_retries()),
        "org-1",
        batch_size,
    ))
}
