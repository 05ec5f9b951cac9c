//! Typed view of a job's persisted state blob
//!
//! Persisted state arrives as raw JSON: either an old-style opaque object or
//! a list of state messages. This module decides which checkpoint shape the
//! connection is using.

use super::types::{GlobalState, StreamState};
use crate::error::{Error, Result};
use crate::protocol::{StateMessage, StateType};
use crate::types::JsonValue;
use tracing::debug;

/// The checkpoint shape a connection currently has persisted
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedState {
    /// Whole-connection blob
    Legacy(JsonValue),
    /// One state per stream
    Stream(Vec<StreamState>),
    /// Per-stream states plus shared cursor
    Global(GlobalState),
}

impl PersistedState {
    /// Interpret a persisted state blob.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    pub fn from_blob(blob: Option<&JsonValue>) -> Result<Option<Self>> {
        let blob = match blob {
            None | Some(JsonValue::Null) => return Ok(None),
            Some(blob) => blob,
        };

        let Ok(messages) = serde_json::from_value::<Vec<StateMessage>>(blob.clone()) else {
            debug!("Persisted state is not a list of state messages, treating it as legacy");
            return Ok(Some(Self::Legacy(blob.clone())));
        };

        match messages.as_slice() {
            [] => Ok(None),
            [single] if single.state_type.is_none() => Ok(Some(Self::Legacy(blob.clone()))),
            [single] if single.state_type == Some(StateType::Global) => {
                let global = single.global.clone().ok_or_else(|| {
                    Error::invalid_state("GLOBAL state message has no 'global' payload")
                })?;
                global.validate()?;
                Ok(Some(Self::Global(global)))
            }
            _ if messages
                .iter()
                .all(|m| m.state_type == Some(StateType::Stream)) =>
            {
                let streams = messages
                    .iter()
                    .map(|m| {
                        m.stream.clone().ok_or_else(|| {
                            Error::invalid_state("STREAM state message has no 'stream' payload")
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Self::Stream(streams)))
            }
            _ if messages
                .iter()
                .all(|m| matches!(m.state_type, None | Some(StateType::Legacy))) =>
            {
                Ok(Some(Self::Legacy(blob.clone())))
            }
            _ => Err(Error::invalid_state(
                "Unexpected state blob, the state contains either multiple global or conflicting state types",
            )),
        }
    }

    /// Checkpoint shape of this state
    pub fn state_type(&self) -> StateType {
        match self {
            Self::Legacy(_) => StateType::Legacy,
            Self::Stream(_) => StateType::Stream,
            Self::Global(_) => StateType::Global,
        }
    }

    /// Per-stream states, empty for legacy state
    pub fn stream_states(&self) -> &[StreamState] {
        match self {
            Self::Legacy(_) => &[],
            Self::Stream(streams) => streams,
            Self::Global(global) => &global.stream_states,
        }
    }
}
