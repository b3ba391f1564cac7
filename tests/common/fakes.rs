//! In-process fakes for the order table, driver errors and the sleeper.

use async_trait::async_trait;
use orders_cdc::error::{Result, SyncError};
use orders_cdc::models::{InsertRecord, UpdateRecord};
use orders_cdc::sync::OrderTable;
use parking_lot::Mutex;
use sqlx::error::{DatabaseError, ErrorKind};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Database error carrying an arbitrary SQLSTATE, as a driver would report it
#[derive(Debug)]
pub struct FakeDbError {
    message: String,
    code: String,
}

impl FakeDbError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            message: message.to_string(),
            code: code.to_string(),
        }
    }

    pub fn into_sqlx(self) -> sqlx::Error {
        sqlx::Error::Database(Box::new(self))
    }
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (SQLSTATE {})", self.message, self.code)
    }
}

impl StdError for FakeDbError {}

impl DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            "23505" => ErrorKind::UniqueViolation,
            "23503" => ErrorKind::ForeignKeyViolation,
            "23502" => ErrorKind::NotNullViolation,
            "23514" => ErrorKind::CheckViolation,
            _ => ErrorKind::Other,
        }
    }
}

/// PostgreSQL unique violation
pub fn duplicate_key_error() -> sqlx::Error {
    FakeDbError::new("23505", "duplicate key value violates unique constraint").into_sqlx()
}

/// PostgreSQL serialization failure
pub fn retryable_error() -> sqlx::Error {
    FakeDbError::new("40001", "could not serialize access due to concurrent update").into_sqlx()
}

/// PostgreSQL undefined table
pub fn fatal_error() -> sqlx::Error {
    FakeDbError::new("42P01", "relation \"tbl_orders\" does not exist").into_sqlx()
}

/// A statement the controller issued
#[derive(Debug, Clone, PartialEq)]
pub enum TableCall {
    Insert(InsertRecord),
    Update(UpdateRecord),
}

/// Order table answering from per-statement scripts
///
/// Once a script runs dry, inserts succeed and updates affect one row.
#[derive(Debug, Default)]
pub struct ScriptedOrderTable {
    inserts: Mutex<VecDeque<std::result::Result<(), sqlx::Error>>>,
    updates: Mutex<VecDeque<std::result::Result<u64, sqlx::Error>>>,
    calls: Mutex<Vec<TableCall>>,
}

impl ScriptedOrderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert(self, response: std::result::Result<(), sqlx::Error>) -> Self {
        self.inserts.lock().push_back(response);
        self
    }

    pub fn on_update(self, response: std::result::Result<u64, sqlx::Error>) -> Self {
        self.updates.lock().push_back(response);
        self
    }

    /// Fail every insert and update with a fresh error from `make`
    pub fn always_failing(attempts: usize, make: fn() -> sqlx::Error) -> Self {
        let table = Self::new();
        for _ in 0..attempts {
            table.inserts.lock().push_back(Err(make()));
            table.updates.lock().push_back(Err(make()));
        }
        table
    }

    pub fn calls(&self) -> Vec<TableCall> {
        self.calls.lock().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl OrderTable for ScriptedOrderTable {
    async fn insert(&self, record: &InsertRecord) -> std::result::Result<(), sqlx::Error> {
        self.calls.lock().push(TableCall::Insert(record.clone()));
        self.inserts.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn update(&self, record: &UpdateRecord) -> std::result::Result<u64, sqlx::Error> {
        self.calls.lock().push(TableCall::Update(record.clone()));
        self.updates.lock().pop_front().unwrap_or(Ok(1))
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
    cancel_on_sleep: bool,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the cancellation token on the first sleep, as an interrupt would
    pub fn cancelling() -> Self {
        Self {
            delays: Mutex::new(Vec::new()),
            cancel_on_sleep: true,
        }
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl orders_cdc::sync::Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        self.delays.lock().push(duration);
        if self.cancel_on_sleep {
            cancel.cancel();
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}
