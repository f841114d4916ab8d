//! # Document Store
//!
//! The backing-store contract the entity caches are written against.
//!
//! ## Architecture
//!
//! ```text
//! DocumentCollection<D> (trait)
//!   ├── PgDocumentCollection<D>   <- JSONB rows in PostgreSQL (sqlx)
//!   └── InMemoryCollection<D>     <- in-process documents with an operation journal
//! ```
//!
//! A collection holds whole documents of one entity kind. Queries are limited
//! to single-field equality, optionally under a locale-aware [`Collation`].

pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use filter::{Collation, CollationStrength, Filter};
pub use memory::{InMemoryCollection, StoreOperation};
pub use postgres::PgDocumentCollection;

use async_trait::async_trait;
use std::sync::Arc;

/// A collection of documents of type `D`
///
/// Operations are awaited by the caller and failures are returned as-is;
/// backends apply no retry of their own.
#[async_trait]
pub trait DocumentCollection<D>: Send + Sync
where
    D: Send + Sync,
{
    /// Name of the collection, used in logs and errors
    fn name(&self) -> &str;

    /// First document matching `filter`, `Ok(None)` when nothing matches
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<D>>;

    /// Every document in the collection
    async fn find_all(&self) -> StoreResult<Vec<D>>;

    async fn insert_one(&self, document: &D) -> StoreResult<()>;

    /// Replace the first document matching `filter`; `false` when none matched
    async fn replace_one(&self, filter: &Filter, document: &D) -> StoreResult<bool>;

    /// Delete the first document matching `filter`; `false` when none matched
    async fn delete_one(&self, filter: &Filter) -> StoreResult<bool>;
}

/// Shared handle to a collection, as held by the entity stores
pub type SharedCollection<D> = Arc<dyn DocumentCollection<D>>;
