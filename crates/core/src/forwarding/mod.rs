//! Forwarding pipeline: source pages in, identified batches out
//!
//! Data flows leaf-first through the submodules:
//! [`source_reader`] → [`identity`] → [`batching`] → [`delivery`], composed
//! by [`pipeline`] into a single pass over one time window.

pub mod batching;
pub mod delivery;
pub mod health;
pub mod identity;
pub mod pipeline;
pub mod ports;
pub mod retry;
pub mod schedule;
pub mod source_reader;
