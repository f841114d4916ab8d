//! PostgreSQL document collection
//!
//! Each collection is a table holding one `JSONB` document per row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS punishment_reasons (document JSONB NOT NULL);
//! ```
//!
//! Exact filters compare JSON values (`document -> 'id' = '7'::jsonb`), so a
//! numeric id never matches its string form. Collated filters compare the text
//! form under an ICU non-deterministic collation created by
//! [`PgDocumentCollection::ensure_collation`].

use super::{Collation, DocumentCollection, Filter, StoreError, StoreResult};
use crate::logging::log_store_operation;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use std::marker::PhantomData;
use std::time::Instant;

/// Bind the two parameters every filter condition uses
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {
        match $filter {
            Filter::Eq { field, value } => $query.bind(field.as_str()).bind(Json(value.clone())),
            Filter::Collated { field, value, .. } => {
                $query.bind(field.as_str()).bind(value.as_str())
            }
        }
    };
}

/// Document collection stored in a PostgreSQL table
#[derive(Clone)]
pub struct PgDocumentCollection<D> {
    pool: PgPool,
    table: String,
    _marker: PhantomData<fn() -> D>,
}

impl<D> std::fmt::Debug for PgDocumentCollection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDocumentCollection")
            .field("table", &self.table)
            .field("pool", &format!("PgPool(size={})", self.pool.size()))
            .finish()
    }
}

impl<D> PgDocumentCollection<D>
where
    D: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static,
{
    /// Wrap the table named `collection`; the name must be a plain SQL identifier
    pub fn new(pool: PgPool, collection: impl Into<String>) -> StoreResult<Self> {
        let table = collection.into();
        validate_identifier(&table)?;
        Ok(Self {
            pool,
            table,
            _marker: PhantomData,
        })
    }

    /// Create the backing table when it does not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (document JSONB NOT NULL)"#,
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(&self.table, "ensure_schema", e))?;
        Ok(())
    }

    /// Create the ICU collation backing collated filters with `collation`
    pub async fn ensure_collation(&self, collation: &Collation) -> StoreResult<()> {
        let name = collation_name(collation)?;
        let sql = format!(
            r#"CREATE COLLATION IF NOT EXISTS "{name}" (provider = icu, locale = '{}-u-ks-level{}', deterministic = false)"#,
            collation.locale,
            collation.strength.level()
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(&self.table, "ensure_collation", e))?;
        Ok(())
    }

    /// SQL condition for `filter`, using `$1` for the field and `$2` for the value
    fn condition(filter: &Filter) -> StoreResult<String> {
        match filter {
            Filter::Eq { .. } => Ok("document -> $1::text = $2::jsonb".to_string()),
            Filter::Collated { collation, .. } => Ok(format!(
                r#"(document ->> $1::text) COLLATE "{}" = $2::text"#,
                collation_name(collation)?
            )),
        }
    }

    fn finish<T>(&self, operation: &str, started: Instant, result: &StoreResult<T>) {
        let status = if result.is_ok() { "ok" } else { "error" };
        log_store_operation(
            operation,
            &self.table,
            status,
            Some(started.elapsed().as_millis() as u64),
            result.as_ref().err().map(|e| e.to_string()).as_deref(),
        );
    }
}

#[async_trait]
impl<D> DocumentCollection<D> for PgDocumentCollection<D>
where
    D: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static,
{
    fn name(&self) -> &str {
        &self.table
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<D>> {
        let started = Instant::now();
        let sql = format!(
            r#"SELECT document FROM "{}" WHERE {} LIMIT 1"#,
            self.table,
            Self::condition(filter)?
        );
        let query = sqlx::query_scalar::<_, Json<D>>(&sql);
        let result = bind_filter!(query, filter)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(|Json(document)| document))
            .map_err(|e| StoreError::backend(&self.table, "find_one", e));

        self.finish("find_one", started, &result);
        result
    }

    async fn find_all(&self) -> StoreResult<Vec<D>> {
        let started = Instant::now();
        let sql = format!(r#"SELECT document FROM "{}""#, self.table);
        let result = sqlx::query_scalar::<_, Json<D>>(&sql)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(|Json(document)| document).collect())
            .map_err(|e| StoreError::backend(&self.table, "find_all", e));

        self.finish("find_all", started, &result);
        result
    }

    async fn insert_one(&self, document: &D) -> StoreResult<()> {
        let started = Instant::now();
        let sql = format!(r#"INSERT INTO "{}" (document) VALUES ($1::jsonb)"#, self.table);
        let result = sqlx::query(&sql)
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::backend(&self.table, "insert_one", e));

        self.finish("insert_one", started, &result);
        result
    }

    async fn replace_one(&self, filter: &Filter, document: &D) -> StoreResult<bool> {
        let started = Instant::now();
        let sql = format!(
            r#"UPDATE "{table}" SET document = $3::jsonb
               WHERE ctid = (SELECT ctid FROM "{table}" WHERE {condition} LIMIT 1)"#,
            table = self.table,
            condition = Self::condition(filter)?
        );
        let query = sqlx::query(&sql);
        let result = bind_filter!(query, filter)
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected() > 0)
            .map_err(|e| StoreError::backend(&self.table, "replace_one", e));

        self.finish("replace_one", started, &result);
        result
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<bool> {
        let started = Instant::now();
        let sql = format!(
            r#"DELETE FROM "{table}"
               WHERE ctid = (SELECT ctid FROM "{table}" WHERE {condition} LIMIT 1)"#,
            table = self.table,
            condition = Self::condition(filter)?
        );
        let query = sqlx::query(&sql);
        let result = bind_filter!(query, filter)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected() > 0)
            .map_err(|e| StoreError::backend(&self.table, "delete_one", e));

        self.finish("delete_one", started, &result);
        result
    }
}

/// Name of the database collation implementing `collation`
pub fn collation_name(collation: &Collation) -> StoreResult<String> {
    let locale = collation.locale.to_lowercase().replace('-', "_");
    let name = format!("punishments_{locale}_level{}", collation.strength.level());
    validate_identifier(&name)?;
    Ok(name)
}

/// Accept lowercase ASCII identifiers only, since they are spliced into SQL
pub fn validate_identifier(identifier: &str) -> StoreResult<()> {
    let mut chars = identifier.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && identifier.len() <= 63 {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(identifier.to_string()))
    }
}
