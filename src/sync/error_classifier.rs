//! # Database Error Classification
//!
//! Maps a raw driver error onto the three outcomes the upsert controller acts on.
//!
//! ## Overview
//!
//! The classifier is the only place that decides retry vs. abort. Each
//! implementation reads its driver's real error taxonomy (SQLSTATE for
//! PostgreSQL, server error numbers for MySQL) rather than matching on message
//! text, so the controller stays driver-agnostic:
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────────────────┐
//! │ sqlx::Error     │────▶│ ErrorClassifier │────▶│ DuplicateKey │ Retryable │   │
//! │                 │     │ (per driver)    │     │ Fatal                        │
//! └─────────────────┘     └─────────────────┘     └──────────────────────────────┘
//! ```
//!
//! Connection-level transport failures reported by the driver (reset, broken
//! pipe, pool acquisition timeout) are retryable for every driver; all other
//! errors are fatal.

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlDatabaseError;
use std::io::ErrorKind as IoErrorKind;

/// Outcome of classifying a database error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Primary key already present; the row exists
    DuplicateKey,
    /// Transient condition; the same statement may succeed later
    Retryable,
    /// Anything else; surfaced to the caller unchanged
    Fatal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::DuplicateKey => write!(f, "duplicate_key"),
            ErrorClass::Retryable => write!(f, "retryable"),
            ErrorClass::Fatal => write!(f, "fatal"),
        }
    }
}

/// Trait for driver-specific error classification
pub trait ErrorClassifier: Send + Sync {
    /// Classify a driver error
    fn classify(&self, error: &sqlx::Error) -> ErrorClass;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// PostgreSQL SQLSTATE codes the classifier recognises
///
/// Full list: <https://www.postgresql.org/docs/current/errcodes-appendix.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PgErrorCode;

impl PgErrorCode {
    /// Unique violation (duplicate key) - Code 23505
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    /// Serialization failure - Code 40001
    pub const SERIALIZATION_FAILURE: &'static str = "40001";

    /// Deadlock detected - Code 40P01
    pub const DEADLOCK_DETECTED: &'static str = "40P01";

    /// Lock not available (lock_timeout / NOWAIT) - Code 55P03
    pub const LOCK_NOT_AVAILABLE: &'static str = "55P03";

    /// Query canceled, including statement_timeout - Code 57014
    pub const QUERY_CANCELED: &'static str = "57014";

    /// Administrator shutdown - Code 57P01
    pub const ADMIN_SHUTDOWN: &'static str = "57P01";

    /// Crash shutdown - Code 57P02
    pub const CRASH_SHUTDOWN: &'static str = "57P02";

    /// Server starting up or in recovery - Code 57P03
    pub const CANNOT_CONNECT_NOW: &'static str = "57P03";

    /// Too many connections - Code 53300
    pub const TOO_MANY_CONNECTIONS: &'static str = "53300";

    /// Class 08: connection exception
    pub const CONNECTION_EXCEPTION_CLASS: &'static str = "08";

    #[inline]
    pub fn is_unique_violation(code: &str) -> bool {
        code == Self::UNIQUE_VIOLATION
    }

    /// Check if the error code is a transient condition worth retrying
    #[inline]
    pub fn is_transient(code: &str) -> bool {
        matches!(
            code,
            Self::SERIALIZATION_FAILURE
                | Self::DEADLOCK_DETECTED
                | Self::LOCK_NOT_AVAILABLE
                | Self::QUERY_CANCELED
                | Self::ADMIN_SHUTDOWN
                | Self::CRASH_SHUTDOWN
                | Self::CANNOT_CONNECT_NOW
                | Self::TOO_MANY_CONNECTIONS
        ) || code.starts_with(Self::CONNECTION_EXCEPTION_CLASS)
    }
}

/// MySQL server and client error numbers the classifier recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MySqlErrorCode;

impl MySqlErrorCode {
    /// ER_DUP_ENTRY
    pub const DUP_ENTRY: u16 = 1062;
    /// ER_DUP_ENTRY_WITH_KEY_NAME
    pub const DUP_ENTRY_WITH_KEY_NAME: u16 = 1586;
    /// ER_LOCK_WAIT_TIMEOUT
    pub const LOCK_WAIT_TIMEOUT: u16 = 1205;
    /// ER_LOCK_DEADLOCK
    pub const LOCK_DEADLOCK: u16 = 1213;
    /// ER_CON_COUNT_ERROR (too many connections)
    pub const CON_COUNT_ERROR: u16 = 1040;
    /// ER_SERVER_SHUTDOWN
    pub const SERVER_SHUTDOWN: u16 = 1053;
    /// ER_OPTION_PREVENTS_STATEMENT, raised by a read-only server during failover
    pub const OPTION_PREVENTS_STATEMENT: u16 = 1290;
    /// ER_QUERY_INTERRUPTED
    pub const QUERY_INTERRUPTED: u16 = 1317;
    /// ER_CONNECTION_KILLED
    pub const CONNECTION_KILLED: u16 = 1927;
    /// CR_SERVER_GONE_ERROR
    pub const SERVER_GONE: u16 = 2006;
    /// CR_SERVER_LOST
    pub const SERVER_LOST: u16 = 2013;

    /// SQLSTATE MySQL reports for deadlocks
    pub const SQLSTATE_DEADLOCK: &'static str = "40001";

    #[inline]
    pub fn is_duplicate_key(number: u16) -> bool {
        matches!(number, Self::DUP_ENTRY | Self::DUP_ENTRY_WITH_KEY_NAME)
    }

    #[inline]
    pub fn is_transient(number: u16) -> bool {
        matches!(
            number,
            Self::LOCK_WAIT_TIMEOUT
                | Self::LOCK_DEADLOCK
                | Self::CON_COUNT_ERROR
                | Self::SERVER_SHUTDOWN
                | Self::OPTION_PREVENTS_STATEMENT
                | Self::QUERY_INTERRUPTED
                | Self::CONNECTION_KILLED
                | Self::SERVER_GONE
                | Self::SERVER_LOST
        )
    }
}

/// Classification of errors raised below the database protocol layer
fn classify_transport_error(error: &sqlx::Error) -> ErrorClass {
    match error {
        sqlx::Error::Io(io) => match io.kind() {
            IoErrorKind::ConnectionReset
            | IoErrorKind::ConnectionAborted
            | IoErrorKind::BrokenPipe
            | IoErrorKind::TimedOut
            | IoErrorKind::UnexpectedEof => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        },
        sqlx::Error::PoolTimedOut => ErrorClass::Retryable,
        _ => ErrorClass::Fatal,
    }
}

/// Classifier for PostgreSQL, keyed on SQLSTATE
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresErrorClassifier;

impl ErrorClassifier for PostgresErrorClassifier {
    fn classify(&self, error: &sqlx::Error) -> ErrorClass {
        let sqlx::Error::Database(db_err) = error else {
            return classify_transport_error(error);
        };

        match db_err.code() {
            Some(code) if PgErrorCode::is_unique_violation(&code) => ErrorClass::DuplicateKey,
            Some(code) if PgErrorCode::is_transient(&code) => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }

    fn classifier_name(&self) -> &'static str {
        "postgres"
    }
}

/// Classifier for MySQL, keyed on the server error number
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlErrorClassifier;

impl MySqlErrorClassifier {
    /// Classification of a raw MySQL error number
    pub fn classify_number(number: u16) -> ErrorClass {
        if MySqlErrorCode::is_duplicate_key(number) {
            ErrorClass::DuplicateKey
        } else if MySqlErrorCode::is_transient(number) {
            ErrorClass::Retryable
        } else {
            ErrorClass::Fatal
        }
    }
}

impl ErrorClassifier for MySqlErrorClassifier {
    fn classify(&self, error: &sqlx::Error) -> ErrorClass {
        let sqlx::Error::Database(db_err) = error else {
            return classify_transport_error(error);
        };

        if let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
            return Self::classify_number(mysql_err.number());
        }

        // Errors not produced by the MySQL driver itself only expose SQLSTATE
        match db_err.code() {
            Some(code) if code == MySqlErrorCode::SQLSTATE_DEADLOCK => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }

    fn classifier_name(&self) -> &'static str {
        "mysql"
    }
}
