//! Error types for Solidafy Replication
//!
//! This module defines the error hierarchy for the replication core.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for Solidafy Replication
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Malformed or unusable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// YAML parse error
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parse error
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // State Errors
    // ============================================================================
    /// Persisted state cannot be used for the requested operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // Source Contract Errors
    // ============================================================================
    /// Source contract violated by the caller
    #[error("Illegal usage: {message}")]
    IllegalUsage {
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // Change Capture Errors
    // ============================================================================
    /// Change event could not be turned into a record
    #[error("Change event conversion failed: {message}")]
    Conversion {
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not exist
    #[error("File not found: {path}")]
    FileNotFound {
        /// Missing path
        path: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Other error
    #[error("{0}")]
    Other(String),

    /// Error from an `anyhow` context chain
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an illegal usage error
    pub fn illegal_usage(message: impl Into<String>) -> Self {
        Self::IllegalUsage {
            message: message.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Nothing raised by the core is transient: configuration and state
    /// mistakes fail the job, contract violations are programming errors.
    /// Only I/O failures while loading files are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Result type alias for Solidafy Replication
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
