//! Protocol types
//!
//! Wire shapes of the messages a source produces. Only the shapes the
//! replication core emits are modelled in full.

use crate::error::{Error, Result};
use crate::state::{CheckpointVariant, GlobalState, StreamDescriptor, StreamState};
use crate::types::{JsonValue, LogLevel};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// A message emitted by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// A data record
    Record {
        /// The record
        record: RecordMessage,
    },
    /// A checkpoint
    State {
        /// The checkpoint
        state: StateMessage,
    },
    /// Log line forwarded from the source
    Log {
        /// The log entry
        log: LogMessage,
    },
}

impl Message {
    /// Create a record message
    pub fn record(record: RecordMessage) -> Self {
        Self::Record { record }
    }

    /// Create a state message from a checkpoint
    pub fn state(checkpoint: CheckpointVariant) -> Self {
        Self::State {
            state: checkpoint.into(),
        }
    }

    /// Wire type of this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Record { .. } => MessageType::Record,
            Self::State { .. } => MessageType::State,
            Self::Log { .. } => MessageType::Log,
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// The checkpoint carried by a state message
    pub fn as_state(&self) -> Option<&StateMessage> {
        match self {
            Self::State { state } => Some(state),
            _ => None,
        }
    }

    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    /// Stream name
    pub stream: String,

    /// Stream namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Record payload
    pub data: JsonValue,

    /// Emission time in epoch milliseconds
    pub emitted_at: i64,
}

impl RecordMessage {
    /// Create a record for a stream, stamped with the current time
    pub fn new(descriptor: &StreamDescriptor, data: JsonValue) -> Self {
        Self {
            stream: descriptor.name.clone(),
            namespace: descriptor.namespace.clone(),
            data,
            emitted_at: Utc::now().timestamp_millis(),
        }
    }

    /// The stream this record belongs to
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.stream.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// A log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Severity
    pub level: LogLevel,
    /// Text
    pub message: String,
}

// ============================================================================
// State Messages
// ============================================================================

/// Checkpoint shape discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    /// Whole-connection opaque blob
    Legacy,
    /// Progress of one stream
    Stream,
    /// Per-stream progress with a shared cursor
    Global,
}

/// Checkpoint as it appears on the wire.
///
/// Every field is optional so that persisted blobs written by older
/// workers (untyped, or keyed by `type`) still parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Shape of the checkpoint
    #[serde(
        rename = "stateType",
        alias = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_type: Option<StateType>,

    /// Legacy payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    /// Stream payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamState>,

    /// Global payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalState>,
}

impl From<CheckpointVariant> for StateMessage {
    fn from(checkpoint: CheckpointVariant) -> Self {
        match checkpoint {
            CheckpointVariant::Legacy(data) => Self {
                state_type: Some(StateType::Legacy),
                data: Some(data),
                ..Self::default()
            },
            CheckpointVariant::Stream(stream) => Self {
                state_type: Some(StateType::Stream),
                stream: Some(stream),
                ..Self::default()
            },
            CheckpointVariant::Global(global) => Self {
                state_type: Some(StateType::Global),
                global: Some(global),
                ..Self::default()
            },
        }
    }
}

impl TryFrom<StateMessage> for CheckpointVariant {
    type Error = Error;

    fn try_from(message: StateMessage) -> Result<Self> {
        match message.state_type {
            // Untyped messages predate typed state and are legacy blobs
            None | Some(StateType::Legacy) => Ok(Self::Legacy(
                message.data.unwrap_or(JsonValue::Null),
            )),
            Some(StateType::Stream) => message
                .stream
                .map(Self::Stream)
                .ok_or_else(|| Error::config("STREAM state message has no 'stream' payload")),
            Some(StateType::Global) => message
                .global
                .map(Self::Global)
                .ok_or_else(|| Error::config("GLOBAL state message has no 'global' payload")),
        }
    }
}

// ============================================================================
// Message Categories
// ============================================================================

/// Every message type of the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Data record
    Record,
    /// Checkpoint
    State,
    /// Log line
    Log,
    /// Result of a connection check
    ConnectionStatus,
    /// Discovered streams
    Catalog,
    /// Error or estimate trace
    Trace,
    /// Connector specification
    Spec,
    /// Control message (e.g. config update)
    Control,
}

/// Category a worker routes a message by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    /// Records and log lines
    Record,
    /// Checkpoints
    State,
    /// Connection check results
    ConnectionStatus,
    /// Catalogs
    Catalog,
    /// Traces
    Trace,
    /// Specifications
    Spec,
    /// Control messages
    Control,
}

impl MessageType {
    /// Routing category of this message type.
    ///
    /// LOG messages are routed with records.
    pub fn category(self) -> MessageCategory {
        match self {
            Self::Record | Self::Log => MessageCategory::Record,
            Self::State => MessageCategory::State,
            Self::ConnectionStatus => MessageCategory::ConnectionStatus,
            Self::Catalog => MessageCategory::Catalog,
            Self::Trace => MessageCategory::Trace,
            Self::Spec => MessageCategory::Spec,
            Self::Control => MessageCategory::Control,
        }
    }
}
