//! Batch construction

use auditbridge_domain::{Batch, ForwarderError, IdentifiedRecord, Result};

/// Split records into contiguous batches of at most `max_size`, preserving order.
///
/// # Errors
/// Returns `ForwarderError::Configuration` when `max_size` is zero.
pub fn chunk(records: Vec<IdentifiedRecord>, max_size: usize) -> Result<Vec<Batch>> {
    if max_size == 0 {
        return Err(ForwarderError::Configuration("batch size must be greater than 0".into()));
    }

    let mut batches = Vec::with_capacity(records.len().div_ceil(max_size));
    let mut remaining = records.into_iter().peekable();
    while remaining.peek().is_some() {
        let records: Vec<_> = remaining.by_ref().take(max_size).collect();
        batches.push(Batch { index: batches.len(), records });
    }
    Ok(batches)
}
