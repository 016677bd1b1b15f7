//! Bounded groups of identified records sent to the sink in one request

use serde::Serialize;

use super::record::IdentifiedRecord;

/// An ordered, non-empty slice of a run's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    /// Zero-based position of the batch within its run.
    pub index: usize,
    pub records: Vec<IdentifiedRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.identity.as_str())
    }
}
