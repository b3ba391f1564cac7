#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Orders CDC Sync
//!
//! Change-data-capture engine that mirrors an order table's key-value change
//! stream into a relational table.
//!
//! ## Overview
//!
//! Each change notification (INSERT, MODIFY or REMOVE) is converted into a
//! typed row and applied with an insert-or-update protocol that tolerates
//! primary-key races, transient database errors and partially applied prior
//! deliveries, without relying on native upsert syntax.
//!
//! ## Module Organization
//!
//! - [`models`] - change records, stream envelope and relational rows
//! - [`sync`] - converter, error classification, backoff, upsert controller, batches
//! - [`database`] - PostgreSQL / MySQL pools and order table access
//! - [`resolver`] - cached connection parameters and credentials
//! - [`config`] - layered configuration
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orders_cdc::config::ConfigLoader;
//! use orders_cdc::database::{DatabaseSettings, OrderDatabase};
//! use orders_cdc::resolver::{ConnectionResolver, JsonFileConnector, TtlCache};
//! use orders_cdc::sync::{BatchProcessor, UpsertController};
//! use orders_cdc::models::StreamEvent;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(event: StreamEvent) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! let cache = Arc::new(TtlCache::from_config(&config.cache));
//! let resolver = ConnectionResolver::new(
//!     config.resolver.clone(),
//!     cache,
//!     Arc::new(JsonFileConnector::new("stores.json")),
//! );
//!
//! let connection = resolver.resolve_connection_config().await?;
//! let credentials = resolver.resolve_credentials().await?;
//! let database = OrderDatabase::connect(
//!     &connection,
//!     &credentials,
//!     &DatabaseSettings::from(&config.database),
//! )
//! .await?;
//!
//! let controller = UpsertController::new(database.order_table(), database.error_classifier());
//! let processor = BatchProcessor::new(controller, config.sync.batch_failure_policy);
//! let report = processor
//!     .process_batch(&event.into_change_records(), &CancellationToken::new())
//!     .await?;
//! println!("applied {} records", report.applied());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod sync;

pub use config::{ConfigLoader, SyncConfig};
pub use database::{DatabaseDriver, OrderDatabase};
pub use error::{Result, SyncError};
pub use models::{ChangeRecord, EventName, InsertRecord, StreamEvent, UpdateRecord};
pub use resolver::{ConnectionConfig, ConnectionResolver, Credentials, TtlCache};
pub use sync::{
    BatchFailurePolicy, BatchProcessor, BatchReport, ErrorClass, ErrorClassifier, UpsertController,
};
