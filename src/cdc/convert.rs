//! Conversion of change events into record messages

use super::event::ChangeEvent;
use crate::error::{Error, Result};
use crate::protocol::RecordMessage;
use crate::state::StreamDescriptor;
use crate::types::{JsonValue, OptionStringExt};
use chrono::{DateTime, Utc};

/// Column holding the time the change was committed
pub const CDC_UPDATED_AT: &str = "_ab_cdc_updated_at";
/// Column holding the deletion time (null unless the row was deleted)
pub const CDC_DELETED_AT: &str = "_ab_cdc_deleted_at";
/// Column holding the log position of the change
pub const CDC_LSN: &str = "_ab_cdc_lsn";

/// Turns a data event into a record.
///
/// `Ok(None)` means the event carries nothing to emit (e.g. a tombstone).
pub trait EventConverter: Send + Sync {
    /// Convert one data event
    fn convert(&self, event: &ChangeEvent) -> Result<Option<RecordMessage>>;
}

impl<F> EventConverter for F
where
    F: Fn(&ChangeEvent) -> Result<Option<RecordMessage>> + Send + Sync,
{
    fn convert(&self, event: &ChangeEvent) -> Result<Option<RecordMessage>> {
        self(event)
    }
}

/// Converter for Debezium-style JSON envelopes:
/// `{"before": .., "after": .., "op": "c|u|d|r", "source": {"schema", "table", "ts_ms", "lsn"}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct DebeziumEnvelopeConverter;

impl EventConverter for DebeziumEnvelopeConverter {
    fn convert(&self, event: &ChangeEvent) -> Result<Option<RecordMessage>> {
        let Some(value) = event.value.as_deref() else {
            return Ok(None);
        };

        let envelope: JsonValue = serde_json::from_str(value)
            .map_err(|e| Error::conversion(format!("Change event value is not JSON: {e}")))?;
        let source = envelope
            .get("source")
            .ok_or_else(|| Error::conversion("Change event has no 'source' block"))?;
        let table = source
            .get("table")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::conversion("Change event source has no 'table'"))?;
        let namespace = source
            .get("schema")
            .or_else(|| source.get("db"))
            .and_then(JsonValue::as_str)
            .map(String::from)
            .none_if_empty();
        let descriptor = StreamDescriptor {
            name: table.to_string(),
            namespace,
        };

        let is_delete = envelope.get("op").and_then(JsonValue::as_str) == Some("d");
        let image = if is_delete { "before" } else { "after" };
        let mut fields = match envelope.get(image) {
            Some(JsonValue::Object(fields)) => fields.clone(),
            _ => {
                return Err(Error::conversion(format!(
                    "Change event for '{descriptor}' has no '{image}' row image"
                )))
            }
        };

        let committed_at = source
            .get("ts_ms")
            .and_then(JsonValue::as_i64)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        fields.insert(CDC_UPDATED_AT.to_string(), JsonValue::from(committed_at.clone()));
        fields.insert(
            CDC_DELETED_AT.to_string(),
            if is_delete {
                JsonValue::from(committed_at)
            } else {
                JsonValue::Null
            },
        );
        if let Some(lsn) = source.get("lsn").or_else(|| event.position_field("lsn")) {
            fields.insert(CDC_LSN.to_string(), lsn.clone());
        }

        Ok(Some(RecordMessage::new(
            &descriptor,
            JsonValue::Object(fields),
        )))
    }
}
