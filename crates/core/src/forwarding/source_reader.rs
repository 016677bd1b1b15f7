//! Windowed, paginated reads from the source API

use std::collections::HashSet;
use std::sync::Arc;

use auditbridge_common::{RetryConfig, RetryExecutor};
use auditbridge_domain::constants::DEFAULT_PAGE_SIZE;
use auditbridge_domain::{AuditRecord, ForwarderError, PageRequest, Result, TimeWindow};
use tracing::{debug, info, instrument, warn};

use super::ports::AuditLogSource;
use super::retry::{last_api_error, TransientApiErrors};

/// Records of one window, merged across pages.
#[derive(Debug, Clone, Default)]
pub struct FetchedWindow {
    pub records: Vec<AuditRecord>,
    /// Pagination stopped while the source still offered a continuation token.
    pub truncated: bool,
}

/// Follows continuation tokens until the source reports the last page.
pub struct SourceReader {
    source: Arc<dyn AuditLogSource>,
    retry: RetryExecutor<TransientApiErrors>,
    page_size: usize,
    max_pages: Option<usize>,
}

impl SourceReader {
    pub fn new(source: Arc<dyn AuditLogSource>, retry_config: RetryConfig) -> Self {
        Self {
            source,
            retry: RetryExecutor::new(retry_config, TransientApiErrors),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Stop after `max_pages` pages even if the source has more.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch every record in `window`.
    ///
    /// Pages are merged as a set: a record whose full content already arrived
    /// on an earlier page is dropped. Each page is retried on its own, so a
    /// retry never re-fetches pages that were already obtained. Hitting the
    /// page cap or a repeated token marks the result as truncated.
    ///
    /// # Errors
    /// Returns `ForwarderError::SourceUnavailable` when a page cannot be
    /// fetched within the retry budget or fails unrecoverably.
    #[instrument(skip(self, window), fields(window = %window))]
    pub async fn fetch(&self, window: &TimeWindow, organization_id: &str) -> Result<FetchedWindow> {
        if self.page_size == 0 {
            return Err(ForwarderError::Configuration("page size must be greater than 0".into()));
        }

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages_fetched = 0usize;
        let mut duplicates = 0usize;
        let mut truncated = false;

        loop {
            if let Some(max_pages) = self.max_pages.filter(|max| pages_fetched >= *max) {
                warn!(pages_fetched, max_pages, "page limit reached with pages remaining, window is truncated");
                truncated = true;
                break;
            }

            let request = PageRequest {
                organization_id: organization_id.to_string(),
                window: *window,
                limit: self.page_size,
                page_token: page_token.clone(),
            };

            let outcome = self
                .retry
                .execute_with_outcome(|| {
                    let source = Arc::clone(&self.source);
                    let request = request.clone();
                    async move { source.fetch_page(&request).await }
                })
                .await;

            let page = match outcome.result {
                Ok(page) => page,
                Err(err) => {
                    let (attempts, error) = last_api_error(err);
                    warn!(page = pages_fetched + 1, attempts, error = %error, "page fetch failed");
                    return Err(ForwarderError::SourceUnavailable { pages_fetched, attempts, error });
                }
            };
            pages_fetched += 1;

            let next_token = page.continuation().map(str::to_owned);
            let item_count = page.items.len();
            for record in page.items {
                if seen.insert(record.content_key()) {
                    records.push(record);
                } else {
                    duplicates += 1;
                }
            }
            debug!(
                page = pages_fetched,
                items = item_count,
                attempts = outcome.attempts,
                has_more = next_token.is_some(),
                "fetched page"
            );

            match next_token {
                None => break,
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    warn!(page = pages_fetched, "source repeated a continuation token, window is truncated");
                    truncated = true;
                    break;
                }
                Some(token) => page_token = Some(token),
            }
        }

        info!(records = records.len(), pages = pages_fetched, duplicates, truncated, "fetched window");
        Ok(FetchedWindow { records, truncated })
    }
}
