//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_BACKOFF_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_OVERLAP_SECS, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOURCETYPE,
    DEFAULT_SOURCE_BASE_URL, DEFAULT_SOURCE_TAG,
};
use crate::errors::{ForwarderError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
}

/// Audit-log source API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default, skip_serializing)]
    pub api_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Stop paginating after this many pages (unbounded when unset).
    #[serde(default)]
    pub max_pages: Option<usize>,
}

/// HEC-style sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default, skip_serializing)]
    pub hec_token: String,
    #[serde(default)]
    pub hec_url: String,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_sourcetype")]
    pub sourcetype: String,
    #[serde(default = "default_source_tag")]
    pub source: String,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

/// Pipeline tuning shared by both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_overlap_secs")]
    pub overlap_secs: u64,
}

impl AppConfig {
    /// Check every setting the forwarder needs before any network activity.
    ///
    /// # Errors
    /// Returns `ForwarderError::Configuration` listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.source.api_token.trim().is_empty() {
            problems.push("CRUSOE_API_TOKEN is required");
        }
        if self.source.organization_id.trim().is_empty() {
            problems.push("CRUSOE_ORG_ID is required");
        }
        if self.source.base_url.trim().is_empty() {
            problems.push("CRUSOE_BASE_URL must not be empty");
        }
        if self.source.page_size == 0 {
            problems.push("PAGE_SIZE must be greater than 0");
        }
        if self.source.max_pages == Some(0) {
            problems.push("MAX_PAGES must be greater than 0 when set");
        }
        if self.sink.hec_token.trim().is_empty() {
            problems.push("SPLUNK_HEC_TOKEN is required");
        }
        if self.sink.hec_url.trim().is_empty() {
            problems.push("SPLUNK_HEC_URL is required");
        }
        if self.forwarding.batch_size == 0 {
            problems.push("BATCH_SIZE must be greater than 0");
        }
        if self.forwarding.request_timeout_secs == 0 {
            problems.push("REQUEST_TIMEOUT must be greater than 0");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ForwarderError::Configuration(problems.join("; ")))
        }
    }
}

impl ForwardingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn overlap(&self) -> Duration {
        Duration::from_secs(self.overlap_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: default_base_url(),
            organization_id: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            hec_token: String::new(),
            hec_url: String::new(),
            index: None,
            sourcetype: default_sourcetype(),
            source: default_source_tag(),
            verify_ssl: true,
        }
    }
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            overlap_secs: DEFAULT_OVERLAP_SECS,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_SOURCE_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_sourcetype() -> String {
    DEFAULT_SOURCETYPE.to_string()
}

fn default_source_tag() -> String {
    DEFAULT_SOURCE_TAG.to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_backoff_ms() -> u64 {
    DEFAULT_BASE_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

fn default_overlap_secs() -> u64 {
    DEFAULT_OVERLAP_SECS
}
