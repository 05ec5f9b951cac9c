//! Configuration types for source jobs
//!
//! This module contains the structures a worker hands to a source when it
//! starts: the job's connection configuration, persisted state and
//! configured catalog, plus tuning for change capture reads.

use crate::error::{Error, Result};
use crate::state::{ResetScope, StreamDescriptor};
use crate::types::{JsonValue, SyncMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Worker Source Config
// ============================================================================

/// Everything a source needs to start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSourceConfig {
    /// Source identifier
    #[serde(default)]
    pub source_id: Option<String>,

    /// Connection configuration (for reset jobs, a `ResetSourceConfiguration`)
    #[serde(default)]
    pub source_connection_configuration: Option<JsonValue>,

    /// State persisted by the previous run
    #[serde(default)]
    pub state: Option<JobState>,

    /// Streams selected for this job
    #[serde(default)]
    pub catalog: ConfiguredCatalog,
}

impl WorkerSourceConfig {
    /// Load a config from a JSON or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read source config '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse source config JSON: {e}")))
    }

    /// Parse a config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse source config YAML: {e}")))
    }

    /// The persisted state blob, if any
    pub fn state_blob(&self) -> Option<&JsonValue> {
        self.state.as_ref()?.state.as_ref()
    }
}

/// Persisted job state wrapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// Raw state blob
    #[serde(default)]
    pub state: Option<JsonValue>,
}

// ============================================================================
// Reset Configuration
// ============================================================================

/// Connection configuration of a reset job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSourceConfiguration {
    /// Streams whose progress should be discarded
    #[serde(default)]
    pub streams_to_reset: Vec<StreamDescriptor>,
}

impl ResetSourceConfiguration {
    /// Parse from a connection configuration value
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            Error::config(format!("The reset configuration format is invalid: {e}"))
        })
    }

    /// Streams to reset as a scope
    pub fn scope(&self) -> ResetScope {
        self.streams_to_reset.iter().cloned().collect()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Configured catalog (selected streams for sync)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Selected streams
    #[serde(default)]
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Descriptors of every selected stream
    pub fn descriptors(&self) -> Vec<StreamDescriptor> {
        self.streams.iter().map(ConfiguredStream::descriptor).collect()
    }
}

/// Configured stream for sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// Stream reference
    pub stream: CatalogStream,

    /// Selected sync mode
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl ConfiguredStream {
    /// Create an incremental stream entry
    pub fn incremental(descriptor: &StreamDescriptor) -> Self {
        Self {
            stream: CatalogStream {
                name: descriptor.name.clone(),
                namespace: descriptor.namespace.clone(),
                json_schema: JsonValue::Null,
            },
            sync_mode: SyncMode::Incremental,
        }
    }

    /// Descriptor of this stream
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.stream.name.clone(),
            namespace: self.stream.namespace.clone(),
        }
    }
}

/// Stream in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStream {
    /// Stream name
    pub name: String,

    /// Stream namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// JSON schema for the stream
    #[serde(default)]
    pub json_schema: JsonValue,
}

// ============================================================================
// Change Capture Config
// ============================================================================

/// Connection config key holding the idle wait in seconds
pub const IDLE_WAIT_KEY: &str = "initial_waiting_seconds";

/// Tuning for change capture reads
#[derive(Debug, Clone)]
pub struct CdcConfig {
    /// How long to wait for an event before probing the capture engine
    pub idle_wait: Duration,
    /// Capacity of the event queue between engine and reader
    pub queue_capacity: usize,
}

impl Default for CdcConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_secs(5),
            queue_capacity: 10_000,
        }
    }
}

impl CdcConfig {
    /// Create a new CDC config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle wait
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Set the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Read overrides from a source connection configuration
    pub fn from_connection_config(config: &JsonValue) -> Result<Self> {
        let mut cdc = Self::default();
        if let Some(value) = config.get(IDLE_WAIT_KEY) {
            let seconds = value.as_u64().ok_or_else(|| {
                Error::config(format!("'{IDLE_WAIT_KEY}' must be a non-negative integer"))
            })?;
            cdc.idle_wait = Duration::from_secs(seconds);
        }
        Ok(cdc)
    }
}
