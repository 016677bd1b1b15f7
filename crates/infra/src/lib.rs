//! # AuditBridge Infrastructure
//!
//! Adapters implementing the ports defined in `auditbridge-core`.
//!
//! This crate contains:
//! - HTTP client shared by the remote adapters
//! - Source API client and HEC sink client
//! - Credential providers
//! - Configuration loading (environment, `.env`, JSON/TOML files)
//! - The daemon scheduler loop

pub mod auth;
pub mod config;
pub mod http;
pub mod integrations;
pub mod scheduling;

pub use auth::{CredentialProvider, StaticTokenProvider};
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::crusoe::CrusoeAuditClient;
pub use integrations::splunk_hec::{HecClient, HecSettings};
pub use scheduling::{DaemonSummary, ForwardScheduler, ForwardSchedulerConfig, SchedulerError};
