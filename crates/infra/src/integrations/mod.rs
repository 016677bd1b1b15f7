//! Remote service integrations
//!
//! - [`crusoe`]: audit-log source API
//! - [`splunk_hec`]: HTTP Event Collector sink

pub mod crusoe;
pub mod splunk_hec;
