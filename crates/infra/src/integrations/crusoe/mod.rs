//! Crusoe Cloud audit-log API

pub mod client;

pub use client::CrusoeAuditClient;
