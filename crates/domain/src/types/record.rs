//! Audit records as fetched from the source API
//!
//! A record is kept as the raw JSON value the source produced, so decoding a
//! page never fails on a single odd item and the sink receives every field
//! with its original type. The five identity key fields are read on demand;
//! a record whose key field is missing or structured is malformed and gets
//! skipped by the pipeline rather than failing the whole page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ForwarderError, Result};

/// Names of the identity key fields, in hashing order.
pub const KEY_FIELDS: [&str; 5] =
    ["start_time", "actor_id", "action", "target_type", "organization_id"];

/// One audit-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecord {
    raw: Value,
}

impl AuditRecord {
    /// Record with all five key fields present.
    pub fn new(
        start_time: impl Into<String>,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        target_type: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert(KEY_FIELDS[0].into(), Value::String(start_time.into()));
        fields.insert(KEY_FIELDS[1].into(), Value::String(actor_id.into()));
        fields.insert(KEY_FIELDS[2].into(), Value::String(action.into()));
        fields.insert(KEY_FIELDS[3].into(), Value::String(target_type.into()));
        fields.insert(KEY_FIELDS[4].into(), Value::String(organization_id.into()));
        Self { raw: Value::Object(fields) }
    }

    /// Set a field, replacing any previous value. No-op on non-object records.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(fields) = &mut self.raw {
            fields.insert(key.into(), value.into());
        }
        self
    }

    /// Drop a field if present.
    #[must_use]
    pub fn without_field(mut self, key: &str) -> Self {
        if let Value::Object(fields) = &mut self.raw {
            fields.remove(key);
        }
        self
    }

    /// The record exactly as received.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Raw value of a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.as_object().and_then(|fields| fields.get(key))
    }

    /// Text form of a scalar field: strings as-is, numbers and booleans in
    /// their JSON spelling. `None` for missing, null or structured values.
    pub fn scalar_text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_text)
    }

    /// Text form of an identity key field.
    ///
    /// # Errors
    /// Returns `ForwarderError::MalformedRecord` when the record is not a JSON
    /// object, or the field is missing, null, an object or an array.
    pub fn key_text(&self, field: &'static str) -> Result<String> {
        let fields = self.raw.as_object().ok_or(ForwarderError::MalformedRecord {
            field: "record",
            problem: "is not a JSON object",
        })?;
        match fields.get(field) {
            None | Some(Value::Null) => {
                Err(ForwarderError::MalformedRecord { field, problem: "is missing" })
            }
            Some(value) => scalar_to_text(value)
                .ok_or(ForwarderError::MalformedRecord { field, problem: "is not a scalar value" }),
        }
    }

    /// Canonical serialisation of the whole record.
    ///
    /// Object keys are sorted at every depth, so two records with the same
    /// content produce the same string regardless of source key order.
    pub fn content_key(&self) -> String {
        canonicalize(self.raw.clone()).to_string()
    }
}

/// A record paired with its content-derived identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedRecord {
    pub identity: String,
    pub record: AuditRecord,
}

fn scalar_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unknown_fields_are_preserved() {
        let raw = json!({
            "start_time": "2024-05-01T10:00:00Z",
            "actor_id": "user-1",
            "action": "CREATE",
            "target_type": "vm",
            "organization_id": "org-1",
            "target_id": "vm-42",
            "details": {"region": "us-east1"}
        });

        let record: AuditRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.key_text("actor_id").unwrap(), "user-1");
        assert_eq!(record.get("target_id"), Some(&json!("vm-42")));

        let round_tripped = serde_json::to_value(&record).unwrap();
        assert_eq!(round_tripped, raw);
    }

    #[test]
    fn test_missing_and_null_key_fields_are_absent() {
        let record: AuditRecord =
            serde_json::from_value(json!({"actor_id": null, "action": "DELETE"})).unwrap();
        assert_eq!(record.scalar_text("start_time"), None);
        assert_eq!(record.scalar_text("actor_id"), None);
        assert_eq!(record.scalar_text("action").as_deref(), Some("DELETE"));
        assert!(matches!(
            record.key_text("actor_id"),
            Err(ForwarderError::MalformedRecord { field: "actor_id", problem: "is missing" })
        ));
    }

    #[test]
    fn test_numeric_key_field_keeps_its_type() {
        let record: AuditRecord =
            serde_json::from_value(json!({"actor_id": 1234, "dry": false})).unwrap();
        assert_eq!(record.key_text("actor_id").unwrap(), "1234");
        assert_eq!(record.scalar_text("dry").as_deref(), Some("false"));

        let payload = serde_json::to_value(&record).unwrap();
        assert_eq!(payload["actor_id"], json!(1234));
        assert_eq!(payload["dry"], json!(false));
    }

    #[test]
    fn test_structured_key_field_still_decodes() {
        let record: AuditRecord =
            serde_json::from_value(json!({"actor_id": {"id": "u2", "type": "user"}})).unwrap();
        assert_eq!(record.scalar_text("actor_id"), None);
        assert!(matches!(
            record.key_text("actor_id"),
            Err(ForwarderError::MalformedRecord { field: "actor_id", problem: "is not a scalar value" })
        ));
    }

    #[test]
    fn test_non_object_record_is_malformed() {
        let record: AuditRecord = serde_json::from_value(json!(42)).unwrap();
        assert!(record.get("action").is_none());
        assert!(matches!(
            record.key_text("start_time"),
            Err(ForwarderError::MalformedRecord { field: "record", .. })
        ));
    }

    #[test]
    fn test_without_field_removes_it() {
        let record = AuditRecord::new("t", "a", "b", "c", "d").without_field("action");
        assert!(record.get("action").is_none());
        assert!(record.get("actor_id").is_some());
    }

    #[test]
    fn test_content_key_ignores_source_key_order() {
        let a: AuditRecord =
            serde_json::from_str(r#"{"action":"A","zeta":1,"alpha":2}"#).unwrap();
        let b: AuditRecord =
            serde_json::from_str(r#"{"alpha":2,"zeta":1,"action":"A"}"#).unwrap();
        assert_eq!(a.content_key(), b.content_key());
    }
}
