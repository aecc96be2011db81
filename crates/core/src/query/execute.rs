//! Query execution with explicit timing context.

use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};
use crate::query::QuerySpec;
use crate::store::{DocumentStore, FindQuery};
use crate::types::Document;

/// Timing and bookkeeping for one query, threaded through both phases of
/// [`execute`] instead of being stashed on a shared query object.
#[derive(Debug)]
pub struct QueryTrace {
    pub collection: String,
    started: Instant,
    /// Matching-document count, when the page guard had to compute it.
    pub total: Option<u64>,
    pub returned: usize,
}

impl QueryTrace {
    pub fn start(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            started: Instant::now(),
            total: None,
            returned: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn finish(&mut self, returned: usize) {
        self.returned = returned;
        tracing::debug!(
            collection = %self.collection,
            returned,
            total = ?self.total,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Query executed"
        );
    }
}

/// Execute `spec` against `collection`.
///
/// When `page` was supplied and the skip reaches past every matching
/// document, fails with [`CoreError::PageOutOfRange`] instead of returning
/// an empty page.
pub async fn execute(
    store: &dyn DocumentStore,
    collection: &str,
    spec: &QuerySpec,
    trace: &mut QueryTrace,
) -> CoreResult<Vec<Document>> {
    let pagination = spec.pagination;

    if pagination.explicit_page {
        let total = store.count(collection, &spec.filter).await?;
        trace.total = Some(total);
        if pagination.skip >= total {
            return Err(CoreError::PageOutOfRange {
                page: pagination.page,
            });
        }
    }

    let query = FindQuery {
        filter: spec.filter.clone(),
        sort: spec.sort.clone(),
        projection: Some(spec.projection.clone()),
        skip: pagination.skip,
        limit: Some(pagination.limit),
    };
    let rows = store.find(collection, &query).await?;

    trace.finish(rows.len());
    Ok(rows)
}
