//! Document store port.
//!
//! Adapters (in-memory, Postgres) implement [`DocumentStore`]; the query
//! builder, reports, and repositories only ever talk to this trait.

use async_trait::async_trait;

use crate::aggregation::Pipeline;
use crate::query::filter::FilterSpec;
use crate::query::projection::Projection;
use crate::query::sort::{sort_documents, SortKey};
use crate::types::Document;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// The filter or pipeline cannot be evaluated (unknown operator, bad stage order).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backend failed (connection, serialization, timeout).
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: FilterSpec,
    pub sort: Vec<SortKey>,
    pub projection: Option<Projection>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Run the find over an in-process document set: filter, then sort,
    /// then projection, then skip/limit.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Result<Vec<Document>, StoreError> {
        let mut matched = Vec::new();
        for doc in docs {
            if self.filter.matches(&doc)? {
                matched.push(doc);
            }
        }
        sort_documents(&mut matched, &self.sort);

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched
            .into_iter()
            .map(|doc| match &self.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .skip(skip)
            .take(limit)
            .collect())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &FilterSpec) -> Result<u64, StoreError>;

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a document. The store assigns `_id`, `__v` and `createdAt`
    /// when they are missing and returns the stored document.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Merge `patch` into the document with `id` (a `null` value clears the
    /// field). Returns the updated document, or `None` if no such id exists.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove a document, returning it if it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &FilterSpec,
    ) -> Result<Option<Document>, StoreError> {
        let query = FindQuery {
            filter: filter.clone(),
            limit: Some(1),
            ..FindQuery::default()
        };
        Ok(self.find(collection, &query).await?.into_iter().next())
    }
}
