//! In-process document store.
//!
//! Collections are insertion-ordered vectors behind a single `RwLock`;
//! finds and pipelines run over a snapshot with the shared evaluator.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tourbook_core::aggregation::{run_pipeline, Pipeline};
use tourbook_core::query::FilterSpec;
use tourbook_core::store::{DocumentStore, FindQuery, StoreError};
use tourbook_core::types::Document;

use crate::collections::{UniqueIndex, UNIQUE_INDEXES};
use crate::document::{document_id, merge_patch, prepare_insert};

#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    indexes: Vec<UniqueIndex>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store enforcing the standard unique indexes.
    pub fn new() -> Self {
        Self::with_indexes(UNIQUE_INDEXES.to_vec())
    }

    pub fn with_indexes(indexes: Vec<UniqueIndex>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            indexes,
        }
    }

    async fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Reject `candidate` if it collides with another document on a unique index.
    fn check_unique(
        &self,
        collection: &str,
        docs: &[Document],
        candidate: &Document,
    ) -> Result<(), StoreError> {
        let candidate_id = document_id(candidate);
        for index in self.indexes.iter().filter(|i| i.collection == collection) {
            let Some(key) = index.key(candidate) else {
                continue;
            };
            let clash = docs
                .iter()
                .filter(|doc| document_id(doc) != candidate_id)
                .any(|doc| index.key(doc).as_ref() == Some(&key));
            if clash {
                return Err(StoreError::Duplicate(index.describe()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        query.apply(self.snapshot(collection).await)
    }

    async fn count(&self, collection: &str, filter: &FilterSpec) -> Result<u64, StoreError> {
        let guard = self.collections.read().await;
        let mut total = 0;
        for doc in guard.get(collection).into_iter().flatten() {
            if filter.matches(doc)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError> {
        run_pipeline(self.snapshot(collection).await, pipeline)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_insert(doc);
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();

        if docs.iter().any(|existing| document_id(existing) == document_id(&doc)) {
            return Err(StoreError::Duplicate(format!("{collection} (_id)")));
        }
        self.check_unique(collection, docs, &doc)?;

        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|doc| document_id(doc) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = docs[position].clone();
        merge_patch(&mut updated, patch);
        self.check_unique(collection, docs, &updated)?;

        docs[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|doc| document_id(doc) == Some(id))
            .map(|position| docs.remove(position)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
