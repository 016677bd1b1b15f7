//! Application constants
//!
//! Centralized location for the defaults shared by the configuration loader,
//! the CLI and the forwarding pipeline.

// Source API defaults
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://api.crusoecloud.com/v1alpha5";
pub const DEFAULT_PAGE_SIZE: usize = 100;

// Sink defaults
pub const DEFAULT_SOURCETYPE: &str = "crusoe:audit";
pub const DEFAULT_SOURCE_TAG: &str = "crusoe_api";
pub const HEC_HEALTH_PATH: &str = "/services/collector/health";

// Forwarding defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

// Scheduling defaults
pub const DEFAULT_OVERLAP_SECS: u64 = 30;
pub const DEFAULT_DAEMON_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LOOKBACK_HOURS: u32 = 1;

/// Number of records echoed to the log in dry-run mode.
pub const DRY_RUN_SAMPLE_SIZE: usize = 5;

pub const USER_AGENT: &str = concat!("auditbridge/", env!("CARGO_PKG_VERSION"));
