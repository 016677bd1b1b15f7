//! Resilient batch delivery

use std::sync::Arc;

use auditbridge_common::{RetryConfig, RetryExecutor};
use auditbridge_domain::{Batch, DeliveryOutcome, DeliveryStatus};
use tracing::{info, instrument, warn};

use super::ports::EventSink;
use super::retry::{last_api_error, TransientApiErrors};

/// Sends batches to the sink, retrying transient failures.
///
/// A failed batch is reported in its [`DeliveryOutcome`]; it never raises, so
/// callers can keep delivering the remaining batches.
pub struct DeliveryClient {
    sink: Arc<dyn EventSink>,
    retry: RetryExecutor<TransientApiErrors>,
}

impl DeliveryClient {
    pub fn new(sink: Arc<dyn EventSink>, retry_config: RetryConfig) -> Self {
        Self { sink, retry: RetryExecutor::new(retry_config, TransientApiErrors) }
    }

    #[instrument(skip(self, batch), fields(batch = batch.index, size = batch.len()))]
    pub async fn send(&self, batch: &Batch) -> DeliveryOutcome {
        let outcome = self
            .retry
            .execute_with_outcome(|| {
                let sink = Arc::clone(&self.sink);
                async move { sink.send_batch(batch).await }
            })
            .await;

        let attempts = outcome.attempts;
        let status = match outcome.result {
            Ok(()) => {
                info!(attempts, "batch delivered");
                DeliveryStatus::Delivered
            }
            Err(err) => {
                let (_, error) = last_api_error(err);
                warn!(attempts, error = %error, "batch delivery failed");
                DeliveryStatus::Failed { cause: error.to_string(), recoverable: error.should_retry() }
            }
        };

        DeliveryOutcome { batch_index: batch.index, size: batch.len(), attempts, status }
    }
}
