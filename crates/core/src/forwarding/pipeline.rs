//! One forwarding pass over one time window

use std::sync::Arc;

use auditbridge_domain::constants::DRY_RUN_SAMPLE_SIZE;
use auditbridge_domain::{AppConfig, Batch, ForwarderError, Result, RunResult, TimeWindow};
use tracing::{info, instrument, warn};

use super::batching::chunk;
use super::delivery::DeliveryClient;
use super::identity::identify;
use super::ports::{AuditLogSource, EventSink};
use super::retry::retry_config_for;
use super::source_reader::SourceReader;

/// Records of a window, identified and chunked, ready for delivery.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub window: TimeWindow,
    pub records_fetched: usize,
    pub records_skipped: usize,
    /// The source had more pages than the reader was allowed to follow.
    pub truncated: bool,
    pub batches: Vec<Batch>,
}

/// Composes the source reader, identity deriver, batch builder and delivery
/// client.
pub struct ForwardingPipeline {
    reader: SourceReader,
    delivery: DeliveryClient,
    organization_id: String,
    batch_size: usize,
}

impl ForwardingPipeline {
    pub fn new(
        reader: SourceReader,
        delivery: DeliveryClient,
        organization_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self { reader, delivery, organization_id: organization_id.into(), batch_size }
    }

    /// Wire a pipeline from configuration and the two adapters.
    pub fn from_config(
        source: Arc<dyn AuditLogSource>,
        sink: Arc<dyn EventSink>,
        config: &AppConfig,
    ) -> Self {
        let retry = retry_config_for(&config.forwarding);
        let reader = SourceReader::new(source, retry.clone())
            .with_page_size(config.source.page_size)
            .with_max_pages(config.source.max_pages);
        let delivery = DeliveryClient::new(sink, retry);
        Self::new(reader, delivery, config.source.organization_id.clone(), config.forwarding.batch_size)
    }

    /// Fetch the window, derive identities and build batches.
    ///
    /// Records whose key fields are missing or structured are skipped and
    /// counted.
    ///
    /// # Errors
    /// `SourceUnavailable` when the fetch fails, `Configuration` when the
    /// batch size is invalid.
    #[instrument(skip(self, window), fields(window = %window))]
    pub async fn collect(&self, window: &TimeWindow) -> Result<PreparedRun> {
        if self.batch_size == 0 {
            return Err(ForwarderError::Configuration("batch size must be greater than 0".into()));
        }

        let fetched = self.reader.fetch(window, &self.organization_id).await?;
        let truncated = fetched.truncated;
        let records = fetched.records;
        let records_fetched = records.len();

        let mut identified = Vec::with_capacity(records_fetched);
        let mut records_skipped = 0usize;
        for record in records {
            match identify(record) {
                Ok(record) => identified.push(record),
                Err(err) => {
                    records_skipped += 1;
                    warn!(error = %err, "skipping malformed record");
                }
            }
        }

        let batches = chunk(identified, self.batch_size)?;
        Ok(PreparedRun { window: *window, records_fetched, records_skipped, truncated, batches })
    }

    /// Deliver prepared batches one after another.
    ///
    /// A failed batch is recorded and the remaining batches are still sent.
    /// In dry-run mode nothing is transmitted; a few sample records are logged.
    #[instrument(skip(self, prepared), fields(window = %prepared.window, batches = prepared.batches.len()))]
    pub async fn deliver(&self, prepared: PreparedRun, dry_run: bool) -> RunResult {
        let mut result = RunResult::new(prepared.window, dry_run);
        result.records_fetched = prepared.records_fetched;
        result.records_skipped = prepared.records_skipped;
        result.truncated = prepared.truncated;
        result.batches_planned = prepared.batches.len();

        if dry_run {
            let samples = prepared.batches.iter().flat_map(|b| b.records.iter()).take(DRY_RUN_SAMPLE_SIZE);
            for (position, sample) in samples.enumerate() {
                let event = serde_json::to_string(&sample.record).unwrap_or_default();
                info!(sample = position + 1, identity = %sample.identity, %event, "dry run sample record");
            }
            info!(
                records = prepared.records_fetched,
                batches = result.batches_planned,
                "dry run: skipping delivery"
            );
            return result;
        }

        for batch in &prepared.batches {
            let outcome = self.delivery.send(batch).await;
            result.record_outcome(outcome);
        }

        info!(
            fetched = result.records_fetched,
            skipped = result.records_skipped,
            attempted = result.batches_attempted,
            succeeded = result.batches_succeeded,
            failed = result.batches_failed,
            "forwarding pass complete"
        );
        result
    }

    /// Run one full pass over `window`.
    ///
    /// A fetch failure is reported in the returned [`RunResult`].
    ///
    /// # Errors
    /// Only `ForwarderError::Configuration` is returned as an error.
    pub async fn run(&self, window: TimeWindow, dry_run: bool) -> Result<RunResult> {
        match self.collect(&window).await {
            Ok(prepared) => Ok(self.deliver(prepared, dry_run).await),
            Err(err) if err.is_configuration() => Err(err),
            Err(err) => {
                warn!(error = %err, window = %window, "fetch failed, window not forwarded");
                Ok(RunResult::fetch_failed(window, dry_run, err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use auditbridge_common::RetryConfig;
    use auditbridge_domain::{ApiError, AuditPage, AuditRecord, PageRequest};
    use chrono::{TimeZone, Utc};

    use super::*;

    struct OnePageSource(Vec<AuditRecord>);

    #[async_trait]
    impl AuditLogSource for OnePageSource {
        async fn fetch_page(&self, _request: &PageRequest) -> std::result::Result<AuditPage, ApiError> {
            Ok(AuditPage { items: self.0.clone(), next_token: None })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl AuditLogSource for FailingSource {
        async fn fetch_page(&self, _request: &PageRequest) -> std::result::Result<AuditPage, ApiError> {
            Err(ApiError::from_status(403, "forbidden"))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        sent: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EventSink for CountingSink {
        async fn send_batch(&self, batch: &Batch) -> std::result::Result<(), ApiError> {
            self.sent.lock().unwrap().push(batch.len());
            Ok(())
        }

        async fn health_check(&self) -> std::result::Result<(), ApiError> {
            Ok(())
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
        )
        .unwrap()
    }

    fn pipeline(source: Arc<dyn AuditLogSource>, sink: Arc<CountingSink>, batch_size: usize) -> ForwardingPipeline {
        let retry = RetryConfig::with_max_retries(1, Duration::from_millis(1), Duration::from_millis(10));
        ForwardingPipeline::new(
            SourceReader::new(source, retry.clone()),
            DeliveryClient::new(sink, retry),
            "org-1",
            batch_size,
        )
    }

    fn records(count: usize) -> Vec<AuditRecord> {
        (0..count)
            .map(|i| AuditRecord::new("2023-11-14T22:15:00Z", format!("user-{i}"), "READ", "vm", "org-1"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_records_are_skipped() {
        let mut input = records(3);
        input[1] = input[1].clone().without_field("organization_id");
        let sink = Arc::new(CountingSink::default());
        let result = pipeline(Arc::new(OnePageSource(input)), Arc::clone(&sink), 10)
            .run(window(), false)
            .await
            .unwrap();

        assert_eq!(result.records_fetched, 3);
        assert_eq!(result.records_skipped, 1);
        assert_eq!(result.records_delivered, 2);
        assert_eq!(*sink.sent.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_plans_without_sending() {
        let sink = Arc::new(CountingSink::default());
        let result = pipeline(Arc::new(OnePageSource(records(12))), Arc::clone(&sink), 5)
            .run(window(), true)
            .await
            .unwrap();

        assert!(result.dry_run);
        assert_eq!(result.batches_planned, 3);
        assert_eq!(result.batches_attempted, 0);
        assert!(sink.sent.lock().unwrap().is_empty());
        assert!(result.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_is_reported_not_raised() {
        let sink = Arc::new(CountingSink::default());
        let result = pipeline(Arc::new(FailingSource), Arc::clone(&sink), 10)
            .run(window(), false)
            .await
            .unwrap();

        assert!(result.fetch_failure.is_some());
        assert_eq!(result.batches_attempted, 0);
        assert!(!result.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_batch_size_is_configuration_error() {
        let sink = Arc::new(CountingSink::default());
        let err = pipeline(Arc::new(OnePageSource(records(1))), sink, 0)
            .run(window(), false)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_window_is_successful_noop() {
        let sink = Arc::new(CountingSink::default());
        let result = pipeline(Arc::new(OnePageSource(Vec::new())), Arc::clone(&sink), 10)
            .run(window(), false)
            .await
            .unwrap();
        assert_eq!(result.batches_planned, 0);
        assert!(result.is_success());
    }
}
