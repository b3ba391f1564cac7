//! # Upsert Retry Controller
//!
//! Applies one change record to the order table with upsert semantics built
//! from two plain statements, converging on the row's real state through the
//! feedback each statement returns.
//!
//! ## State Machine
//!
//! ```text
//!              INSERT event                        MODIFY event
//!   Init ───────────────────▶ AttemptInsert   Init ────────────▶ AttemptUpdate
//!
//!   AttemptInsert ── ok ───────────────────────────────────────▶ Success
//!   AttemptInsert ── duplicate key ──▶ AttemptUpdate (forced, for all remaining attempts)
//!   AttemptUpdate ── ok, rows > 0 ─────────────────────────────▶ Success
//!   AttemptUpdate ── ok, rows = 0, forced ─────────────────────▶ Success
//!   AttemptUpdate ── ok, rows = 0, not forced ──▶ AttemptInsert
//!   any attempt   ── retryable ──▶ sleep n² units, same operation
//!   any attempt   ── fatal / malformed record ─────────────────▶ Fail
//!   attempts exhausted ────────────────────────────────────────▶ Fail (MaxRetriesExceeded)
//! ```
//!
//! `REMOVE` events never reach the table: removals are handled by the store's
//! TTL cleanup and are reported as success without any statement.
//!
//! Each attempt is an independent statement; nothing is wrapped in a shared
//! transaction, since the duplicate-key and zero-rows signals drive the machine.

use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::error::{Result, SyncError};
use crate::models::{ChangeRecord, EventName, InsertRecord, UpdateRecord};
use crate::sync::backoff::{BackoffPolicy, Sleeper, TokioSleeper};
use crate::sync::converter::RecordConverter;
use crate::sync::error_classifier::{ErrorClass, ErrorClassifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Statements the controller issues against the order table
///
/// Connection handling belongs to the implementation; the controller only
/// issues statements and reads their outcome.
#[async_trait]
pub trait OrderTable: Send + Sync {
    /// Insert a full row
    async fn insert(&self, record: &InsertRecord) -> std::result::Result<(), sqlx::Error>;

    /// Update the mutable columns of an existing row, returning rows affected
    async fn update(&self, record: &UpdateRecord) -> std::result::Result<u64, sqlx::Error>;
}

/// States of a single record's processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertState {
    Init,
    AttemptInsert,
    AttemptUpdate,
    Success,
    Fail,
}

impl UpsertState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

impl fmt::Display for UpsertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::AttemptInsert => write!(f, "attempt_insert"),
            Self::AttemptUpdate => write!(f, "attempt_update"),
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// What the successful terminal attempt did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum AppliedChange {
    /// `REMOVE` event, no statement issued
    RemovalIgnored,
    Inserted,
    Updated { rows_affected: u64 },
}

/// Successful processing of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub change: AppliedChange,
    /// Attempts consumed, 0 for ignored removals
    pub attempts: u32,
}

/// Statement issued by an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Insert,
    Update,
}

impl Operation {
    fn state(self) -> UpsertState {
        match self {
            Self::Insert => UpsertState::AttemptInsert,
            Self::Update => UpsertState::AttemptUpdate,
        }
    }
}

/// Mutable state of one processing call
#[derive(Debug)]
struct Machine {
    state: UpsertState,
    operation: Operation,
    /// Set once an insert hit a duplicate key; disables the update→insert fallback
    forced_update: bool,
}

impl Machine {
    fn new(first: Operation) -> Self {
        debug!(
            from = %UpsertState::Init,
            to = %first.state(),
            attempt = 1,
            reason = "initial_operation",
            "Upsert state transition"
        );
        Self {
            state: first.state(),
            operation: first,
            forced_update: false,
        }
    }

    fn transition(&mut self, next: UpsertState, attempt: u32, reason: &str) {
        debug!(
            from = %self.state,
            to = %next,
            attempt = attempt,
            reason = reason,
            "Upsert state transition"
        );
        self.state = next;
    }

    fn switch_to(&mut self, operation: Operation, attempt: u32, reason: &str) {
        self.operation = operation;
        self.transition(operation.state(), attempt, reason);
    }
}

/// Drives one change record to a terminal outcome
pub struct UpsertController {
    table: Arc<dyn OrderTable>,
    classifier: Arc<dyn ErrorClassifier>,
    converter: RecordConverter,
    sleeper: Arc<dyn Sleeper>,
    backoff: BackoffPolicy,
    max_attempts: u32,
}

impl fmt::Debug for UpsertController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpsertController")
            .field("classifier", &self.classifier.classifier_name())
            .field("converter", &self.converter)
            .field("backoff", &self.backoff)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl UpsertController {
    pub fn new(table: Arc<dyn OrderTable>, classifier: Arc<dyn ErrorClassifier>) -> Self {
        Self {
            table,
            classifier,
            converter: RecordConverter::default(),
            sleeper: Arc::new(TokioSleeper),
            backoff: BackoffPolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_converter(mut self, converter: RecordConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Values below 1 are raised to 1
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn converter(&self) -> &RecordConverter {
        &self.converter
    }

    /// Process a record without external cancellation
    pub async fn process(&self, record: &ChangeRecord) -> Result<UpsertOutcome> {
        self.process_with_cancellation(record, &CancellationToken::new())
            .await
    }

    /// Process a record, aborting between attempts once `cancel` fires
    #[instrument(
        skip(self, record, cancel),
        fields(
            event_id = %record.event_id_or_unknown(),
            event_name = %record.event_name,
            order_id = %record.key_for_logging(&self.converter.schema().primary_key_attribute),
        )
    )]
    pub async fn process_with_cancellation(
        &self,
        record: &ChangeRecord,
        cancel: &CancellationToken,
    ) -> Result<UpsertOutcome> {
        let first = match record.event_name {
            EventName::Remove => {
                debug!("Ignoring REMOVE event, handled by TTL cleanup");
                return Ok(UpsertOutcome {
                    change: AppliedChange::RemovalIgnored,
                    attempts: 0,
                });
            }
            EventName::Insert => Operation::Insert,
            EventName::Modify => Operation::Update,
        };
        let mut machine = Machine::new(first);
        let mut last_error = String::from("no attempt completed");

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                machine.transition(UpsertState::Fail, attempt, "cancelled");
                return Err(SyncError::Cancelled);
            }

            let error = match machine.operation {
                Operation::Insert => {
                    let row = self.convert(&mut machine, attempt, |c| c.to_insert_record(record))?;
                    match self.table.insert(&row).await {
                        Ok(()) => {
                            machine.transition(UpsertState::Success, attempt, "inserted");
                            info!(attempt = attempt, "Inserted order record");
                            return Ok(UpsertOutcome {
                                change: AppliedChange::Inserted,
                                attempts: attempt,
                            });
                        }
                        Err(error) => error,
                    }
                }
                Operation::Update => {
                    let row = self.convert(&mut machine, attempt, |c| c.to_update_record(record))?;
                    match self.table.update(&row).await {
                        Ok(0) if !machine.forced_update => {
                            debug!(attempt = attempt, "No rows updated, falling back to insert");
                            last_error = "update affected no rows".to_string();
                            machine.switch_to(Operation::Insert, attempt, "zero_rows_updated");
                            continue;
                        }
                        Ok(rows_affected) => {
                            machine.transition(UpsertState::Success, attempt, "updated");
                            info!(
                                attempt = attempt,
                                rows_affected = rows_affected,
                                "Updated order record"
                            );
                            return Ok(UpsertOutcome {
                                change: AppliedChange::Updated { rows_affected },
                                attempts: attempt,
                            });
                        }
                        Err(error) => error,
                    }
                }
            };

            let class = self.classifier.classify(&error);
            match (machine.operation, class) {
                (Operation::Insert, ErrorClass::DuplicateKey) => {
                    debug!(attempt = attempt, "Primary key exists, converging to update");
                    last_error = error.to_string();
                    machine.forced_update = true;
                    machine.switch_to(Operation::Update, attempt, "duplicate_key");
                }
                (_, ErrorClass::Retryable) => {
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "Retryable database error"
                    );
                    last_error = error.to_string();
                    if attempt < self.max_attempts {
                        let delay = self.backoff.delay_for(attempt);
                        if let Err(cancelled) = self.sleeper.sleep(delay, cancel).await {
                            machine.transition(UpsertState::Fail, attempt, "cancelled");
                            return Err(cancelled);
                        }
                    }
                }
                _ => {
                    machine.transition(UpsertState::Fail, attempt, "fatal_error");
                    warn!(
                        attempt = attempt,
                        classification = %class,
                        error = %error,
                        "Fatal database error, aborting record"
                    );
                    return Err(SyncError::Database(error));
                }
            }
        }

        machine.transition(UpsertState::Fail, self.max_attempts, "max_retries_exceeded");
        warn!(attempts = self.max_attempts, "Record not applied, retries exhausted");
        Err(SyncError::MaxRetriesExceeded {
            order_id: record.key_for_logging(&self.converter.schema().primary_key_attribute),
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn convert<T>(
        &self,
        machine: &mut Machine,
        attempt: u32,
        f: impl FnOnce(&RecordConverter) -> Result<T>,
    ) -> Result<T> {
        f(&self.converter).map_err(|error| {
            machine.transition(UpsertState::Fail, attempt, "conversion_failed");
            warn!(attempt = attempt, error = %error, "Failed to convert change record");
            error
        })
    }
}
