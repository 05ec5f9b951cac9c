//! Checkpoint value types
//!
//! These types describe replication progress as it is exchanged with
//! destinations and persisted between runs.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Identity of one logical stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream name
    pub name: String,

    /// Stream namespace (schema, database, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl StreamDescriptor {
    /// Create a descriptor without a namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Progress of a single stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// The stream this state belongs to
    #[serde(rename = "streamDescriptor")]
    pub descriptor: StreamDescriptor,

    /// Opaque progress blob; `None` means the stream has no saved progress
    #[serde(rename = "streamState", default)]
    pub state: Option<JsonValue>,
}

impl StreamState {
    /// Create a stream state with progress
    pub fn new(descriptor: StreamDescriptor, state: JsonValue) -> Self {
        Self {
            descriptor,
            state: Some(state),
        }
    }

    /// Create a reset (progress-free) stream state
    pub fn reset(descriptor: StreamDescriptor) -> Self {
        Self {
            descriptor,
            state: None,
        }
    }

    /// Whether this stream has no saved progress
    pub fn is_reset(&self) -> bool {
        self.state.is_none()
    }
}

/// Per-stream progress plus one connection-wide shared cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    /// Cursor shared by every stream (e.g. a replication log position)
    #[serde(default)]
    pub shared_state: Option<JsonValue>,

    /// State of every stream the connection knows about
    #[serde(default)]
    pub stream_states: Vec<StreamState>,
}

impl GlobalState {
    /// Create a global state
    pub fn new(shared_state: Option<JsonValue>, stream_states: Vec<StreamState>) -> Self {
        Self {
            shared_state,
            stream_states,
        }
    }

    /// Find the state of a stream
    pub fn get_stream(&self, descriptor: &StreamDescriptor) -> Option<&StreamState> {
        self.stream_states
            .iter()
            .find(|s| &s.descriptor == descriptor)
    }

    /// Check that every stream appears at most once
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.stream_states.len());
        for stream_state in &self.stream_states {
            if !seen.insert(&stream_state.descriptor) {
                return Err(Error::invalid_state(format!(
                    "Global state lists stream '{}' more than once",
                    stream_state.descriptor
                )));
            }
        }
        Ok(())
    }
}

/// A checkpoint in one of the three supported shapes.
///
/// A sync keeps the same variant for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointVariant {
    /// Whole-connection opaque blob
    Legacy(JsonValue),
    /// Progress of one stream
    Stream(StreamState),
    /// Per-stream progress with a shared cursor
    Global(GlobalState),
}

impl CheckpointVariant {
    /// An empty legacy checkpoint (`{}`)
    pub fn empty_legacy() -> Self {
        Self::Legacy(JsonValue::Object(serde_json::Map::new()))
    }

    /// A progress-free checkpoint for one stream
    pub fn reset_stream(descriptor: StreamDescriptor) -> Self {
        Self::Stream(StreamState::reset(descriptor))
    }
}

/// Streams an operator asked to reset.
///
/// Keeps the order streams were listed in; repeated descriptors collapse
/// to their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetScope {
    streams: Vec<StreamDescriptor>,
    index: HashSet<StreamDescriptor>,
}

impl ResetScope {
    /// Build a scope from descriptors in enumeration order
    pub fn new(descriptors: impl IntoIterator<Item = StreamDescriptor>) -> Self {
        let mut scope = Self::default();
        for descriptor in descriptors {
            if scope.index.insert(descriptor.clone()) {
                scope.streams.push(descriptor);
            }
        }
        scope
    }

    /// Whether the stream is being reset
    pub fn contains(&self, descriptor: &StreamDescriptor) -> bool {
        self.index.contains(descriptor)
    }

    /// Number of streams in scope
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether no stream is in scope
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Iterate in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter()
    }

    /// Whether every one of `streams` is in scope
    pub fn covers<'a>(&self, streams: impl IntoIterator<Item = &'a StreamDescriptor>) -> bool {
        streams.into_iter().all(|d| self.contains(d))
    }

    /// Copy the scope into a queue, preserving order
    pub fn to_queue(&self) -> VecDeque<StreamDescriptor> {
        self.streams.iter().cloned().collect()
    }
}

impl FromIterator<StreamDescriptor> for ResetScope {
    fn from_iter<T: IntoIterator<Item = StreamDescriptor>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_equality_includes_namespace() {
        let a = StreamDescriptor::new("users").with_namespace("public");
        let b = StreamDescriptor::new("users").with_namespace("public");
        let c = StreamDescriptor::new("users");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "public.users");
        assert_eq!(c.to_string(), "users");
    }

    #[test]
    fn test_descriptor_serialization_omits_missing_namespace() {
        let json = serde_json::to_value(StreamDescriptor::new("users")).unwrap();
        assert_eq!(json, json!({"name": "users"}));

        let parsed: StreamDescriptor =
            serde_json::from_value(json!({"name": "users", "namespace": null})).unwrap();
        assert_eq!(parsed, StreamDescriptor::new("users"));
    }

    #[test]
    fn test_stream_state_wire_shape() {
        let state = StreamState::reset(StreamDescriptor::new("orders").with_namespace("shop"));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            json!({
                "streamDescriptor": {"name": "orders", "namespace": "shop"},
                "streamState": null
            })
        );
        assert!(state.is_reset());
    }

    #[test]
    fn test_global_state_validate_rejects_duplicates() {
        let users = StreamDescriptor::new("users");
        let global = GlobalState::new(
            None,
            vec![
                StreamState::new(users.clone(), json!({"cursor": 1})),
                StreamState::reset(users),
            ],
        );

        let err = global.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_global_state_get_stream() {
        let users = StreamDescriptor::new("users");
        let global = GlobalState::new(
            Some(json!({"lsn": 10})),
            vec![StreamState::new(users.clone(), json!({"cursor": 1}))],
        );

        assert!(global.validate().is_ok());
        assert_eq!(
            global.get_stream(&users).unwrap().state,
            Some(json!({"cursor": 1}))
        );
        assert!(global.get_stream(&StreamDescriptor::new("orders")).is_none());
    }

    #[test]
    fn test_reset_scope_dedup_keeps_first_order() {
        let scope: ResetScope = ["b", "a", "b", "c"]
            .into_iter()
            .map(StreamDescriptor::new)
            .collect();

        let names: Vec<_> = scope.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(scope.len(), 3);
        assert_eq!(scope.to_queue().len(), 3);
    }

    #[test]
    fn test_reset_scope_covers() {
        let a = StreamDescriptor::new("a");
        let b = StreamDescriptor::new("b");
        let scope = ResetScope::new([a.clone()]);

        assert!(scope.covers([&a]));
        assert!(!scope.covers([&a, &b]));
        assert!(ResetScope::default().is_empty());
    }
}
