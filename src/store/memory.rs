//! In-process document collection
//!
//! Keeps documents in their JSON form and records every operation in a
//! journal, which makes it the backend of choice for tests and for running
//! without a database (`store.backend = "memory"`).

use super::{DocumentCollection, Filter, StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::trace;

/// A single operation issued against an [`InMemoryCollection`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    FindOne(Filter),
    FindAll,
    InsertOne,
    ReplaceOne(Filter),
    DeleteOne(Filter),
}

impl StoreOperation {
    pub const FIND_ONE: &'static str = "find_one";
    pub const FIND_ALL: &'static str = "find_all";
    pub const INSERT_ONE: &'static str = "insert_one";
    pub const REPLACE_ONE: &'static str = "replace_one";
    pub const DELETE_ONE: &'static str = "delete_one";

    pub fn kind(&self) -> &'static str {
        match self {
            StoreOperation::FindOne(_) => Self::FIND_ONE,
            StoreOperation::FindAll => Self::FIND_ALL,
            StoreOperation::InsertOne => Self::INSERT_ONE,
            StoreOperation::ReplaceOne(_) => Self::REPLACE_ONE,
            StoreOperation::DeleteOne(_) => Self::DELETE_ONE,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    documents: Vec<Value>,
    journal: Vec<StoreOperation>,
    armed_failures: Vec<&'static str>,
}

/// Document collection held entirely in memory
pub struct InMemoryCollection<D> {
    name: String,
    inner: Mutex<Inner>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> std::fmt::Debug for InMemoryCollection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("InMemoryCollection")
            .field("name", &self.name)
            .field("documents", &inner.documents.len())
            .field("journal", &inner.journal.len())
            .finish()
    }
}

impl<D> InMemoryCollection<D>
where
    D: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner::default()),
            _marker: PhantomData,
        }
    }

    /// Create a collection pre-filled with `documents`; seeding is not journaled
    pub fn with_documents(
        name: impl Into<String>,
        documents: impl IntoIterator<Item = D>,
    ) -> StoreResult<Self> {
        let collection = Self::new(name);
        {
            let mut inner = collection.inner.lock();
            for document in documents {
                inner.documents.push(serde_json::to_value(&document)?);
            }
        }
        Ok(collection)
    }

    /// Snapshot of the stored documents, in insertion order
    pub fn documents(&self) -> StoreResult<Vec<D>> {
        let inner = self.inner.lock();
        inner
            .documents
            .iter()
            .map(|value| serde_json::from_value(value.clone()).map_err(StoreError::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every operation issued so far, oldest first
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.inner.lock().journal.clone()
    }

    /// Number of journaled operations of the given kind (see the `StoreOperation` constants)
    pub fn count(&self, kind: &str) -> usize {
        self.inner
            .lock()
            .journal
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    pub fn clear_journal(&self) {
        self.inner.lock().journal.clear();
    }

    /// Make the next operation of `kind` fail with [`StoreError::Injected`]
    pub fn fail_next(&self, kind: &'static str) {
        self.inner.lock().armed_failures.push(kind);
    }

    /// Journal `operation`, then consume an armed failure for its kind if any
    fn record(&self, inner: &mut Inner, operation: StoreOperation) -> StoreResult<()> {
        let kind = operation.kind();
        trace!(collection = %self.name, operation = kind, "in-memory store operation");
        inner.journal.push(operation);

        if let Some(position) = inner.armed_failures.iter().position(|armed| *armed == kind) {
            inner.armed_failures.remove(position);
            return Err(StoreError::Injected {
                collection: self.name.clone(),
                operation: kind.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<D> DocumentCollection<D> for InMemoryCollection<D>
where
    D: Serialize + DeserializeOwned + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<D>> {
        let mut inner = self.inner.lock();
        self.record(&mut inner, StoreOperation::FindOne(filter.clone()))?;

        inner
            .documents
            .iter()
            .find(|document| filter.matches(document))
            .map(|document| serde_json::from_value(document.clone()).map_err(StoreError::from))
            .transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<D>> {
        let mut inner = self.inner.lock();
        self.record(&mut inner, StoreOperation::FindAll)?;

        inner
            .documents
            .iter()
            .map(|document| serde_json::from_value(document.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn insert_one(&self, document: &D) -> StoreResult<()> {
        let value = serde_json::to_value(document)?;
        let mut inner = self.inner.lock();
        self.record(&mut inner, StoreOperation::InsertOne)?;
        inner.documents.push(value);
        Ok(())
    }

    async fn replace_one(&self, filter: &Filter, document: &D) -> StoreResult<bool> {
        let value = serde_json::to_value(document)?;
        let mut inner = self.inner.lock();
        self.record(&mut inner, StoreOperation::ReplaceOne(filter.clone()))?;

        match inner.documents.iter_mut().find(|doc| filter.matches(doc)) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        self.record(&mut inner, StoreOperation::DeleteOne(filter.clone()))?;

        match inner.documents.iter().position(|doc| filter.matches(doc)) {
            Some(position) => {
                inner.documents.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Collation;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: i32,
        name: String,
    }

    fn doc(id: i32, name: &str) -> Doc {
        Doc {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_crud_and_journal() {
        let collection = InMemoryCollection::<Doc>::new("docs");

        collection.insert_one(&doc(1, "Spam")).await.unwrap();
        assert_eq!(
            collection.find_one(&Filter::eq("id", 1)).await.unwrap(),
            Some(doc(1, "Spam"))
        );

        let replaced = collection
            .replace_one(&Filter::eq("id", 1), &doc(1, "Werbung"))
            .await
            .unwrap();
        assert!(replaced);
        assert_eq!(collection.documents().unwrap(), vec![doc(1, "Werbung")]);

        let deleted = collection.delete_one(&Filter::eq("id", 1)).await.unwrap();
        assert!(deleted);
        assert!(collection.is_empty());

        assert_eq!(collection.count(StoreOperation::INSERT_ONE), 1);
        assert_eq!(collection.count(StoreOperation::FIND_ONE), 1);
        assert_eq!(collection.count(StoreOperation::REPLACE_ONE), 1);
        assert_eq!(collection.count(StoreOperation::DELETE_ONE), 1);
    }

    #[tokio::test]
    async fn test_replace_and_delete_report_misses() {
        let collection = InMemoryCollection::<Doc>::new("docs");
        assert!(!collection
            .replace_one(&Filter::eq("id", 9), &doc(9, "x"))
            .await
            .unwrap());
        assert!(!collection.delete_one(&Filter::eq("id", 9)).await.unwrap());
    }

    #[tokio::test]
    async fn test_collated_lookup() {
        let collection =
            InMemoryCollection::with_documents("docs", vec![doc(3, "Hacking")]).unwrap();
        let found = collection
            .find_one(&Filter::collated("name", "hACKING", Collation::default()))
            .await
            .unwrap();
        assert_eq!(found, Some(doc(3, "Hacking")));
        // seeding is not journaled, the lookup is
        assert_eq!(collection.operations().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let collection = InMemoryCollection::<Doc>::new("docs");
        collection.fail_next(StoreOperation::INSERT_ONE);

        let err = collection.insert_one(&doc(1, "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Injected { .. }));
        assert!(collection.is_empty());

        collection.insert_one(&doc(1, "a")).await.unwrap();
        assert_eq!(collection.len(), 1);
    }
}
