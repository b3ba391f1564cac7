//! # Constants
//!
//! Attribute names of the upstream order stream, default limits and the
//! environment variable names the resolver reads.

use std::time::Duration;

/// Change-stream attribute names
pub mod attributes {
    pub const PRIMARY_KEY: &str = "p_key";
    pub const MERCHANT_ID: &str = "merchant_id";
    pub const AMOUNT: &str = "amount";
    pub const CURRENCY: &str = "currency";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Field names reported in conversion errors
pub mod fields {
    pub const ORDER_ID: &str = "orderId";
}

/// Environment variable names
pub mod env {
    /// Holds the parameter-store name of the connection parameters
    pub const CONNECTION_PARAM_NAME: &str = "rds_conn_param_name";
    /// Holds the secret id of the database credentials
    pub const CREDENTIALS_SECRET_ID: &str = "rds_cred_secrets_arn";
    pub const ENVIRONMENT: &str = "ORDERS_CDC_ENV";
    pub const LOG_FORMAT: &str = "ORDERS_CDC_LOG_FORMAT";
    pub const CONFIG_PREFIX: &str = "ORDERS_CDC";
}

pub const DEFAULT_TABLE_NAME: &str = "tbl_orders";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

pub const DEFAULT_CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_CACHE_MAX_CAPACITY: u64 = 1_000;

/// Rendering of epoch seconds bound into SQL timestamp columns (UTC)
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
