//! # Database Operations
//!
//! Pool construction and schema migrations for the PostgreSQL-backed stores and event log.
//!
//! ```rust,no_run
//! use order_pipeline::config::DatabaseSettings;
//! use order_pipeline::database::{DatabaseConnection, DatabaseMigrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseSettings::default()).await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use migrations::DatabaseMigrations;
