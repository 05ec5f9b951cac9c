//! Change events as handed over by the capture engine

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Destination prefix the capture engine uses for heartbeat events
pub const HEARTBEAT_TOPIC_PREFIX: &str = "__debezium-heartbeat";

/// One event produced by the capture engine.
///
/// Either a real data mutation or a heartbeat that only advances the known
/// replication position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Serialized record key
    #[serde(default)]
    pub key: Option<String>,

    /// Serialized record value (the change envelope)
    #[serde(default)]
    pub value: Option<String>,

    /// Topic the engine routed this event to
    #[serde(default)]
    pub destination: Option<String>,

    /// Source offset fields (e.g. `lsn`) attached by the engine
    #[serde(default, alias = "sourcePositionFields")]
    pub source_position: Option<JsonObject>,
}

impl ChangeEvent {
    /// Create a data event
    pub fn data(key: Option<String>, value: impl Into<String>) -> Self {
        Self {
            key,
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Create a heartbeat event carrying the given offset fields
    pub fn heartbeat(source_position: JsonObject) -> Self {
        Self {
            destination: Some(format!("{HEARTBEAT_TOPIC_PREFIX}.server")),
            source_position: Some(source_position),
            ..Self::default()
        }
    }

    /// Set the destination topic
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the source offset fields
    #[must_use]
    pub fn with_source_position(mut self, source_position: JsonObject) -> Self {
        self.source_position = Some(source_position);
        self
    }

    /// Whether this event is a heartbeat
    pub fn is_heartbeat(&self) -> bool {
        self.destination
            .as_deref()
            .is_some_and(|d| d.starts_with(HEARTBEAT_TOPIC_PREFIX))
    }

    /// Look up one source offset field
    pub fn position_field(&self, field: &str) -> Option<&JsonValue> {
        self.source_position.as_ref()?.get(field)
    }
}
