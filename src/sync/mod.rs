//! # Record Processing Core
//!
//! Converts change records into typed rows and applies them to the order table.
//!
//! - [`converter`] - schema-driven record conversion
//! - [`error_classifier`] - driver error → duplicate key / retryable / fatal
//! - [`backoff`] - quadratic backoff and the injectable sleeper
//! - [`upsert`] - the per-record retry state machine
//! - [`batch`] - in-order batch processing with an explicit failure policy

pub mod backoff;
pub mod batch;
pub mod converter;
pub mod error_classifier;
pub mod upsert;

pub use backoff::{BackoffPolicy, Sleeper, TokioSleeper};
pub use batch::{BatchFailurePolicy, BatchProcessor, BatchReport, RecordFailure};
pub use converter::{FieldKind, FieldSpec, OrderSchema, RecordConverter};
pub use error_classifier::{
    ErrorClass, ErrorClassifier, MySqlErrorClassifier, MySqlErrorCode, PgErrorCode,
    PostgresErrorClassifier,
};
pub use upsert::{AppliedChange, OrderTable, UpsertController, UpsertOutcome, UpsertState};
