//! # Database Operations
//!
//! Connection management for the PostgreSQL document backend.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use punishments_core::config::DatabaseConfig;
//! use punishments_core::database::DatabaseConnection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseConfig::default()).await?;
//! assert!(db.health_check().await?);
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;

pub use connection::DatabaseConnection;
