//! Typed relational rows produced from change records.

use crate::constants::SQL_TIMESTAMP_FORMAT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full row for `INSERT`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRecord {
    pub order_id: String,
    pub merchant_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    /// Epoch seconds
    pub created_at: i64,
    /// Epoch seconds
    pub updated_at: i64,
}

/// Mutable subset for `UPDATE`; ownership and creation time never change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    /// Epoch seconds
    pub updated_at: i64,
}

/// Convert epoch seconds to a UTC timestamp, `None` when out of range or negative
pub fn epoch_to_utc(epoch_seconds: i64) -> Option<DateTime<Utc>> {
    if epoch_seconds < 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn render_sql_timestamp(epoch_seconds: i64) -> Option<String> {
    epoch_to_utc(epoch_seconds).map(|ts| ts.format(SQL_TIMESTAMP_FORMAT).to_string())
}

impl InsertRecord {
    pub fn created_at_sql(&self) -> Option<String> {
        render_sql_timestamp(self.created_at)
    }

    pub fn updated_at_sql(&self) -> Option<String> {
        render_sql_timestamp(self.updated_at)
    }
}

impl UpdateRecord {
    pub fn updated_at_sql(&self) -> Option<String> {
        render_sql_timestamp(self.updated_at)
    }
}
