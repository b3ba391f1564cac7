use super::order_table::{MySqlOrderTable, PgOrderTable};
use crate::config::DatabaseConfig;
use crate::error::{Result, SyncError};
use crate::resolver::{ConnectionConfig, Credentials};
use crate::sync::{ErrorClassifier, MySqlErrorClassifier, OrderTable, PostgresErrorClassifier};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{MySqlPool, PgPool};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database flavour named by the resolved connection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseDriver {
    Postgres,
    MySql,
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::MySql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DatabaseDriver {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pgx" => Ok(Self::Postgres),
            _ => Err(SyncError::UnsupportedDriver(s.to_string())),
        }
    }
}

impl ConnectionConfig {
    pub fn driver(&self) -> Result<DatabaseDriver> {
        self.driver_name.parse()
    }
}

/// Pool sizing and target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub table_name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl From<&DatabaseConfig> for DatabaseSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            table_name: config.table_name.clone(),
            max_connections: config.max_connections,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

/// Connected pool for one of the supported drivers
#[derive(Debug, Clone)]
pub enum OrderDatabase {
    Postgres { pool: PgPool, table_name: String },
    MySql { pool: MySqlPool, table_name: String },
}

impl OrderDatabase {
    /// Open a pool from resolved parameters; the password travels only in typed options
    pub async fn connect(
        connection: &ConnectionConfig,
        credentials: &Credentials,
        settings: &DatabaseSettings,
    ) -> Result<Self> {
        let driver = connection.driver()?;

        info!(
            driver = %driver,
            hostname = %connection.hostname,
            port = connection.port,
            database = %connection.database,
            max_connections = settings.max_connections,
            "Connecting to order database"
        );

        let database = match driver {
            DatabaseDriver::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&connection.hostname)
                    .port(connection.port)
                    .database(&connection.database)
                    .username(&credentials.username)
                    .password(&credentials.password);
                let pool = PgPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .acquire_timeout(settings.acquire_timeout)
                    .connect_with(options)
                    .await
                    .map_err(SyncError::Database)?;
                Self::Postgres {
                    pool,
                    table_name: settings.table_name.clone(),
                }
            }
            DatabaseDriver::MySql => {
                let options = MySqlConnectOptions::new()
                    .host(&connection.hostname)
                    .port(connection.port)
                    .database(&connection.database)
                    .username(&credentials.username)
                    .password(&credentials.password);
                let pool = MySqlPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .acquire_timeout(settings.acquire_timeout)
                    .connect_with(options)
                    .await
                    .map_err(SyncError::Database)?;
                Self::MySql {
                    pool,
                    table_name: settings.table_name.clone(),
                }
            }
        };

        info!(driver = %driver, "Order database pool ready");
        Ok(database)
    }

    pub fn driver(&self) -> DatabaseDriver {
        match self {
            Self::Postgres { .. } => DatabaseDriver::Postgres,
            Self::MySql { .. } => DatabaseDriver::MySql,
        }
    }

    pub fn order_table(&self) -> Arc<dyn OrderTable> {
        match self {
            Self::Postgres { pool, table_name } => {
                Arc::new(PgOrderTable::new(pool.clone(), table_name))
            }
            Self::MySql { pool, table_name } => {
                Arc::new(MySqlOrderTable::new(pool.clone(), table_name))
            }
        }
    }

    /// Classifier matching this driver's error taxonomy
    pub fn error_classifier(&self) -> Arc<dyn ErrorClassifier> {
        match self {
            Self::Postgres { .. } => Arc::new(PostgresErrorClassifier),
            Self::MySql { .. } => Arc::new(MySqlErrorClassifier),
        }
    }

    pub async fn health_check(&self) -> Result<bool> {
        let health = match self {
            Self::Postgres { pool, .. } => {
                sqlx::query_scalar::<_, i32>("SELECT 1")
                    .fetch_one(pool)
                    .await
                    .map_err(SyncError::Database)? as i64
            }
            Self::MySql { pool, .. } => sqlx::query_scalar::<_, i64>("SELECT 1")
                .fetch_one(pool)
                .await
                .map_err(SyncError::Database)?,
        };
        Ok(health == 1)
    }

    pub async fn close(self) {
        match self {
            Self::Postgres { pool, .. } => pool.close().await,
            Self::MySql { pool, .. } => pool.close().await,
        }
    }
}
