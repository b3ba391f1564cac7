//! # Batch Processing
//!
//! Feeds the records of one stream batch through the [`UpsertController`] in
//! order, one at a time. What happens to the rest of the batch when a record
//! cannot be applied is an explicit [`BatchFailurePolicy`]:
//!
//! - [`BatchFailurePolicy::AbortBatch`] stops at the first unrecovered failure
//!   and reports it as [`SyncError::BatchAborted`], so the transport redelivers
//!   the whole batch.
//! - [`BatchFailurePolicy::SkipRecord`] records the failure in the
//!   [`BatchReport`] and moves on to the next record.
//!
//! Cancellation always aborts, whichever policy is active.

use crate::error::{Result, SyncError};
use crate::logging::log_batch_operation;
use crate::models::ChangeRecord;
use crate::sync::upsert::{AppliedChange, UpsertController};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Handling of a record that could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    #[default]
    AbortBatch,
    SkipRecord,
}

impl fmt::Display for BatchFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortBatch => write!(f, "abort_batch"),
            Self::SkipRecord => write!(f, "skip_record"),
        }
    }
}

impl std::str::FromStr for BatchFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "abort_batch" => Ok(Self::AbortBatch),
            "skip_record" => Ok(Self::SkipRecord),
            _ => Err(format!("Invalid batch failure policy: {s}")),
        }
    }
}

/// A record skipped under [`BatchFailurePolicy::SkipRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub position: usize,
    pub event_id: String,
    pub order_id: String,
    pub error: String,
    /// The record itself was malformed, as opposed to a database failure
    pub data_error: bool,
}

/// Summary of one processed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub removals_ignored: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    fn new(batch_id: Uuid, total: usize) -> Self {
        Self {
            batch_id,
            total,
            inserted: 0,
            updated: 0,
            removals_ignored: 0,
            failures: Vec::new(),
        }
    }

    pub fn applied(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs whole batches through the upsert controller
#[derive(Debug)]
pub struct BatchProcessor {
    controller: UpsertController,
    policy: BatchFailurePolicy,
}

impl BatchProcessor {
    pub fn new(controller: UpsertController, policy: BatchFailurePolicy) -> Self {
        Self { controller, policy }
    }

    pub fn policy(&self) -> BatchFailurePolicy {
        self.policy
    }

    pub fn controller(&self) -> &UpsertController {
        &self.controller
    }

    /// Process every record in order; see the module docs for failure handling
    pub async fn process_batch(
        &self,
        records: &[ChangeRecord],
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::new(Uuid::new_v4(), records.len());
        let primary_key = self.controller.converter().schema().primary_key_attribute.as_str();

        info!(
            batch_id = %report.batch_id,
            records = records.len(),
            policy = %self.policy,
            "Processing change batch"
        );

        for (position, record) in records.iter().enumerate() {
            match self
                .controller
                .process_with_cancellation(record, cancel)
                .await
            {
                Ok(outcome) => match outcome.change {
                    AppliedChange::Inserted => report.inserted += 1,
                    AppliedChange::Updated { .. } => report.updated += 1,
                    AppliedChange::RemovalIgnored => report.removals_ignored += 1,
                },
                Err(err) if err.is_cancelled() || self.policy == BatchFailurePolicy::AbortBatch => {
                    error!(
                        batch_id = %report.batch_id,
                        position = position,
                        event_id = %record.event_id_or_unknown(),
                        error = %err,
                        "Aborting batch on unrecovered record failure"
                    );
                    return Err(SyncError::BatchAborted {
                        position,
                        event_id: record.event_id_or_unknown().to_string(),
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        batch_id = %report.batch_id,
                        position = position,
                        event_id = %record.event_id_or_unknown(),
                        error = %err,
                        "Skipping record that could not be applied"
                    );
                    report.failures.push(RecordFailure {
                        position,
                        event_id: record.event_id_or_unknown().to_string(),
                        order_id: record.key_for_logging(primary_key),
                        error: err.to_string(),
                        data_error: err.is_data_error(),
                    });
                }
            }
        }

        log_batch_operation(
            &report.batch_id.to_string(),
            report.total,
            report.inserted,
            report.updated,
            report.removals_ignored,
            report.failures.len(),
        );
        Ok(report)
    }
}
