//! Content-derived record identity
//!
//! The identity is the sink's deduplication key. It is a SHA-256 digest over
//! the five key fields in fixed order; each field is framed with an 8-byte
//! big-endian length so that `("ab", "c")` and `("a", "bc")` never collide.

use auditbridge_domain::{AuditRecord, IdentifiedRecord, Result, KEY_FIELDS};
use sha2::{Digest, Sha256};

/// Derive the identity of a record.
///
/// # Errors
/// Returns `ForwarderError::MalformedRecord` naming the first key field that
/// is missing or not a scalar.
pub fn derive(record: &AuditRecord) -> Result<String> {
    let mut hasher = Sha256::new();
    for field in KEY_FIELDS {
        let value = record.key_text(field)?;
        let bytes = value.as_bytes();
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Pair a record with its identity.
pub fn identify(record: AuditRecord) -> Result<IdentifiedRecord> {
    let identity = derive(&record)?;
    Ok(IdentifiedRecord { identity, record })
}
