//! Outcomes of batch deliveries and whole forwarding passes

use serde::Serialize;

use super::window::TimeWindow;

/// Result of delivering one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub batch_index: usize,
    pub size: usize,
    pub attempts: u32,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed { cause: String, recoverable: bool },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered)
    }
}

/// Outcome of one forwarding pass over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub window: TimeWindow,
    pub dry_run: bool,
    pub records_fetched: usize,
    /// Records dropped because a key field was missing or not a scalar.
    pub records_skipped: usize,
    /// Pagination stopped early (page cap or repeated token); records past
    /// the last page read were not forwarded.
    pub truncated: bool,
    /// Batches the records were split into (also reported in dry-run).
    pub batches_planned: usize,
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub records_delivered: usize,
    pub fetch_failure: Option<String>,
    /// Human-readable failure causes, in batch order.
    pub failures: Vec<String>,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl RunResult {
    pub fn new(window: TimeWindow, dry_run: bool) -> Self {
        Self {
            window,
            dry_run,
            records_fetched: 0,
            records_skipped: 0,
            truncated: false,
            batches_planned: 0,
            batches_attempted: 0,
            batches_succeeded: 0,
            batches_failed: 0,
            records_delivered: 0,
            fetch_failure: None,
            failures: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// A pass whose fetch failed; no batches were built.
    pub fn fetch_failed(window: TimeWindow, dry_run: bool, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        let mut result = Self::new(window, dry_run);
        result.failures.push(cause.clone());
        result.fetch_failure = Some(cause);
        result
    }

    pub fn record_outcome(&mut self, outcome: DeliveryOutcome) {
        self.batches_attempted += 1;
        match &outcome.status {
            DeliveryStatus::Delivered => {
                self.batches_succeeded += 1;
                self.records_delivered += outcome.size;
            }
            DeliveryStatus::Failed { cause, .. } => {
                self.batches_failed += 1;
                self.failures.push(format!("batch {}: {}", outcome.batch_index, cause));
            }
        }
        self.outcomes.push(outcome);
    }

    /// True when the fetch succeeded and no batch failed.
    pub fn is_success(&self) -> bool {
        self.fetch_failure.is_none() && self.batches_failed == 0
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_outcomes_are_aggregated() {
        let mut result = RunResult::new(window(), false);
        result.record_outcome(DeliveryOutcome {
            batch_index: 0,
            size: 100,
            attempts: 1,
            status: DeliveryStatus::Delivered,
        });
        result.record_outcome(DeliveryOutcome {
            batch_index: 1,
            size: 20,
            attempts: 1,
            status: DeliveryStatus::Failed { cause: "HTTP 400".into(), recoverable: false },
        });

        assert_eq!(result.batches_attempted, 2);
        assert_eq!(result.batches_succeeded, 1);
        assert_eq!(result.batches_failed, 1);
        assert_eq!(result.records_delivered, 100);
        assert_eq!(result.failures, vec!["batch 1: HTTP 400".to_string()]);
        assert!(!result.is_success());
    }

    #[test]
    fn test_fetch_failure_is_not_success() {
        let result = RunResult::fetch_failed(window(), false, "source down");
        assert_eq!(result.fetch_failure.as_deref(), Some("source down"));
        assert_eq!(result.batches_attempted, 0);
        assert!(!result.is_success());
    }

    #[test]
    fn test_empty_run_is_success() {
        assert!(RunResult::new(window(), true).is_success());
    }
}
