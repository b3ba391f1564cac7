//! # Database Operations
//!
//! Relational side of the sync: driver selection, pool construction and the
//! sqlx implementations of [`OrderTable`](crate::sync::OrderTable).
//!
//! ## Key Components
//!
//! - [`connection`] - [`DatabaseDriver`] parsing and the [`OrderDatabase`] pool
//! - [`statements`] - insert/update SQL per driver
//! - [`order_table`] - [`PgOrderTable`] and [`MySqlOrderTable`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use orders_cdc::database::{DatabaseSettings, OrderDatabase};
//! use orders_cdc::resolver::{ConnectionConfig, Credentials};
//!
//! # async fn example(connection: ConnectionConfig, credentials: Credentials) -> orders_cdc::Result<()> {
//! let database = OrderDatabase::connect(&connection, &credentials, &DatabaseSettings::default()).await?;
//! assert!(database.health_check().await?);
//! let table = database.order_table();
//! let classifier = database.error_classifier();
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod order_table;
pub mod statements;

pub use connection::{DatabaseDriver, DatabaseSettings, OrderDatabase};
pub use order_table::{MySqlOrderTable, PgOrderTable};
pub use statements::OrderStatements;
