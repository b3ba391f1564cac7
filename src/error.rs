//! # Sync Error Taxonomy
//!
//! Every failure the sync engine can surface to a caller. Duplicate-key and
//! retryable database conditions are *not* represented here: they are
//! [`ErrorClass`](crate::sync::ErrorClass) signals consumed by the upsert
//! controller and only become a [`SyncError`] once retries are exhausted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A required key or attribute is absent from the change record
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// An attribute is present but is not encoded as the expected type
    #[error("Field '{field}' has an unexpected type: {reason}")]
    TypeMismatch { field: String, reason: String },

    /// A database error that the active classifier judged fatal
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Retryable failures persisted through every allowed attempt
    #[error("Record '{order_id}' not applied after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        order_id: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Environment variable '{0}' is not set")]
    EnvVarMissing(String),

    /// A serialized payload (cache entry, parameter, secret) could not be parsed
    #[error("Failed to parse {what}: {reason}")]
    ConfigParse { what: String, reason: String },

    /// The external parameter or secret store failed to answer a lookup
    #[error("External store lookup for '{key}' failed: {reason}")]
    Store { key: String, reason: String },

    #[error("Unsupported database driver '{0}'")]
    UnsupportedDriver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Processing was cancelled while waiting between attempts
    #[error("Processing cancelled")]
    Cancelled,

    /// A batch stopped at the first unrecovered record failure
    #[error("Batch aborted at record {position} (event {event_id}): {source}")]
    BatchAborted {
        position: usize,
        event_id: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn type_mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config_parse(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ConfigParse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn store(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Store {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the record itself is malformed and retrying cannot help
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::TypeMismatch { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
