//! Splunk HTTP Event Collector sink

pub mod client;
pub mod envelope;

pub use client::HecClient;
pub use envelope::{encode_batch, event_time, HecSettings};
