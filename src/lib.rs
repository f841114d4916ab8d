#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Punishments Core
//!
//! Entity caching and persistence layer for a game-server punishments plugin.
//!
//! ## Overview
//!
//! Command handlers look up players and punishment reasons by whatever
//! identifier a moderator typed: a player uuid, a numeric reason id or a reason
//! name in any casing. Records are served from memory, pulled from the backing
//! document store on a miss, and written back in batches by a flush.
//!
//! ## Module Organization
//!
//! - [`cache`] - The generic [`Cache`] map, the [`EntityStore`] contract and the player and reason stores
//! - [`store`] - Document collection contract with PostgreSQL and in-memory backends
//! - [`models`] - Player, punishment and reason documents
//! - [`context`] - [`PunishmentsContext`], the explicitly constructed store container
//! - [`config`] - Layered configuration loading
//! - [`database`] - PostgreSQL connection pool
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use punishments_core::cache::EntityStore;
//! use punishments_core::PunishmentsContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! punishments_core::logging::init_structured_logging();
//!
//! let context = PunishmentsContext::new().await?;
//! let reasons = context.reasons();
//!
//! // "7", "spam" and "SPAM" all resolve to the same reason
//! if let Some(reason) = reasons.get(&"spam".to_string()).await? {
//!     let ban = reason.punish("console", chrono::Utc::now().timestamp_millis());
//!     context
//!         .players()
//!         .punish("069a79f4-44e9-4726-a5be-fca90e38aaf5", ban)
//!         .await?;
//! }
//!
//! context.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;

pub use cache::{Cache, CacheStats, EntityStore, KeyMatching, PlayerStore, ReasonStore};
pub use config::{ConfigManager, PunishmentsConfig};
pub use context::PunishmentsContext;
pub use error::{PunishmentsError, Result};
pub use models::{Punishment, PunishmentPlayer, PunishmentReason, PunishmentType};
pub use store::{Collation, DocumentCollection, Filter, InMemoryCollection, StoreError};
