//! sqlx-backed [`OrderTable`] implementations.
//!
//! Each attempt is a single statement on a pooled connection with no
//! surrounding transaction; the raw `sqlx::Error` is returned untouched so the
//! controller's classifier can inspect it.

use super::connection::DatabaseDriver;
use super::statements::OrderStatements;
use crate::models::{render_sql_timestamp, InsertRecord, UpdateRecord};
use crate::sync::OrderTable;
use async_trait::async_trait;
use sqlx::{MySqlPool, PgPool};

fn sql_timestamp(epoch_seconds: i64, field: &str) -> Result<String, sqlx::Error> {
    render_sql_timestamp(epoch_seconds).ok_or_else(|| {
        sqlx::Error::Encode(format!("{field}: {epoch_seconds} is not a valid timestamp").into())
    })
}

#[derive(Debug, Clone)]
pub struct PgOrderTable {
    pool: PgPool,
    statements: OrderStatements,
}

impl PgOrderTable {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            statements: OrderStatements::for_driver(DatabaseDriver::Postgres, table),
        }
    }
}

#[async_trait]
impl OrderTable for PgOrderTable {
    async fn insert(&self, record: &InsertRecord) -> Result<(), sqlx::Error> {
        let created_at = sql_timestamp(record.created_at, "created_at")?;
        let updated_at = sql_timestamp(record.updated_at, "updated_at")?;

        sqlx::query(&self.statements.insert)
            .bind(&record.order_id)
            .bind(&record.merchant_id)
            .bind(record.amount)
            .bind(&record.currency)
            .bind(&record.status)
            .bind(created_at)
            .bind(updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, record: &UpdateRecord) -> Result<u64, sqlx::Error> {
        let updated_at = sql_timestamp(record.updated_at, "updated_at")?;

        let result = sqlx::query(&self.statements.update)
            .bind(record.amount)
            .bind(&record.currency)
            .bind(&record.status)
            .bind(updated_at)
            .bind(&record.order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct MySqlOrderTable {
    pool: MySqlPool,
    statements: OrderStatements,
}

impl MySqlOrderTable {
    pub fn new(pool: MySqlPool, table: &str) -> Self {
        Self {
            pool,
            statements: OrderStatements::for_driver(DatabaseDriver::MySql, table),
        }
    }
}

#[async_trait]
impl OrderTable for MySqlOrderTable {
    async fn insert(&self, record: &InsertRecord) -> Result<(), sqlx::Error> {
        let created_at = sql_timestamp(record.created_at, "created_at")?;
        let updated_at = sql_timestamp(record.updated_at, "updated_at")?;

        sqlx::query(&self.statements.insert)
            .bind(&record.order_id)
            .bind(&record.merchant_id)
            .bind(record.amount)
            .bind(&record.currency)
            .bind(&record.status)
            .bind(created_at)
            .bind(updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // sqlx negotiates CLIENT_FOUND_ROWS, so rows_affected counts matched rows
    // as on PostgreSQL: re-applying an identical image still reports 1.
    async fn update(&self, record: &UpdateRecord) -> Result<u64, sqlx::Error> {
        let updated_at = sql_timestamp(record.updated_at, "updated_at")?;

        let result = sqlx::query(&self.statements.update)
            .bind(record.amount)
            .bind(&record.currency)
            .bind(&record.status)
            .bind(updated_at)
            .bind(&record.order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
