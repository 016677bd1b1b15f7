//! HEC event envelopes
//!
//! Each record is wrapped as
//! `{"time", "event", "source", "sourcetype", "index"?, "fields": {"event_id"}}`
//! and a batch body is the envelopes joined by newlines.

use auditbridge_domain::{ApiError, AuditRecord, Batch, SinkConfig};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// Static envelope metadata from the sink configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HecSettings {
    pub source: String,
    pub sourcetype: String,
    pub index: Option<String>,
}

impl HecSettings {
    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            source: config.source.clone(),
            sourcetype: config.sourcetype.clone(),
            index: config.index.clone().filter(|index| !index.trim().is_empty()),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    time: f64,
    event: &'a AuditRecord,
    source: &'a str,
    sourcetype: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<&'a str>,
    fields: EnvelopeFields<'a>,
}

/// Indexed fields; `event_id` is the sink's deduplication key.
#[derive(Serialize)]
struct EnvelopeFields<'a> {
    event_id: &'a str,
}

/// Epoch seconds of the record's `start_time`, or of `fallback` when the
/// field is missing or unparsable.
pub fn event_time(record: &AuditRecord, fallback: DateTime<Utc>) -> f64 {
    let parsed = record.scalar_text("start_time").as_deref().and_then(parse_timestamp);
    epoch_seconds(parsed.unwrap_or(fallback))
}

/// Serialise a batch into a newline-delimited HEC request body.
///
/// # Errors
/// Returns `ApiError::Payload` if a record cannot be serialised.
pub fn encode_batch(batch: &Batch, settings: &HecSettings, now: DateTime<Utc>) -> Result<String, ApiError> {
    let mut lines = Vec::with_capacity(batch.len());
    for identified in &batch.records {
        let envelope = Envelope {
            time: event_time(&identified.record, now),
            event: &identified.record,
            source: &settings.source,
            sourcetype: &settings.sourcetype,
            index: settings.index.as_deref(),
            fields: EnvelopeFields { event_id: &identified.identity },
        };
        let line = serde_json::to_string(&envelope)
            .map_err(|err| ApiError::Payload(format!("failed to encode event {}: {err}", identified.identity)))?;
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Offset-less timestamps are taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|naive| naive.and_utc())
}

fn epoch_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use auditbridge_domain::IdentifiedRecord;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;

    fn settings(index: Option<&str>) -> HecSettings {
        HecSettings {
            source: "crusoe_api".into(),
            sourcetype: "crusoe:audit".into(),
            index: index.map(String::from),
        }
    }

    fn identified(start_time: &str, identity: &str) -> IdentifiedRecord {
        IdentifiedRecord {
            identity: identity.into(),
            record: AuditRecord::new(start_time, "user-1", "CREATE", "vm", "org-1").with_field("target_id", "vm-9"),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_800_000_000, 0).unwrap()
    }

    #[test]
    fn envelope_carries_metadata_and_identity() {
        let batch = Batch { index: 0, records: vec![identified("2024-05-01T10:00:00.5Z", "id-1")] };
        let body = encode_batch(&batch, &settings(Some("audit")), now()).unwrap();
        let envelope: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(envelope["time"], json!(1_714_557_600.5));
        assert_eq!(envelope["source"], "crusoe_api");
        assert_eq!(envelope["sourcetype"], "crusoe:audit");
        assert_eq!(envelope["index"], "audit");
        assert_eq!(envelope["fields"]["event_id"], "id-1");
        assert_eq!(envelope["event"]["target_id"], "vm-9");
        assert_eq!(envelope["event"]["actor_id"], "user-1");
    }

    #[test]
    fn event_keeps_source_value_types() {
        let mut record = identified("2024-05-01T10:00:00Z", "id-1");
        record.record = record.record.with_field("actor_id", json!(1234)).with_field("success", true);
        let batch = Batch { index: 0, records: vec![record] };
        let body = encode_batch(&batch, &settings(None), now()).unwrap();
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["event"]["actor_id"], json!(1234));
        assert_eq!(envelope["event"]["success"], json!(true));
    }

    #[test]
    fn index_is_omitted_when_unset() {
        let batch = Batch { index: 0, records: vec![identified("2024-05-01T10:00:00Z", "id-1")] };
        let body = encode_batch(&batch, &settings(None), now()).unwrap();
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert!(envelope.get("index").is_none());
    }

    #[test]
    fn batch_body_is_newline_delimited() {
        let batch = Batch {
            index: 3,
            records: vec![
                identified("2024-05-01T10:00:00Z", "id-1"),
                identified("2024-05-01T10:00:01Z", "id-2"),
                identified("2024-05-01T10:00:02Z", "id-3"),
            ],
        };
        let body = encode_batch(&batch, &settings(None), now()).unwrap();
        let ids: Vec<String> = body
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["fields"]["event_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["id-1", "id-2", "id-3"]);
    }

    #[test]
    fn unparsable_time_falls_back_to_now() {
        let record = AuditRecord::new("yesterday", "u", "a", "t", "o");
        assert_eq!(event_time(&record, now()), 1_800_000_000.0);
    }

    #[test]
    fn offsets_and_naive_timestamps_are_understood() {
        let with_offset = AuditRecord::new("2024-05-01T12:00:00+02:00", "u", "a", "t", "o");
        let naive = AuditRecord::new("2024-05-01T10:00:00", "u", "a", "t", "o");
        assert_eq!(event_time(&with_offset, now()), 1_714_557_600.0);
        assert_eq!(event_time(&naive, now()), 1_714_557_600.0);
    }

    #[test]
    fn blank_index_is_treated_as_unset() {
        let config = SinkConfig { index: Some("  ".into()), ..SinkConfig::default() };
        assert_eq!(HecSettings::from_config(&config).index, None);
    }
}
