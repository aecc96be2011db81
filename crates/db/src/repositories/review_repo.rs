//! Repository for `reviews` and the rating aggregates they drive.

use serde_json::{json, Value};
use tourbook_core::aggregation::report::{rating_summary, round_rating, DEFAULT_RATING_AVERAGE};
use tourbook_core::aggregation::run_report;
use tourbook_core::error::CoreResult;
use tourbook_core::store::DocumentStore;
use tourbook_core::types::Document;

use crate::collections::REVIEWS;
use crate::models::review::{RatingSummary, ReviewParent};

pub struct ReviewRepo;

impl ReviewRepo {
    /// Recompute review count and average for `parent` and persist them on
    /// the parent document. Called after every review create, update and delete.
    pub async fn recompute_rating(
        store: &dyn DocumentStore,
        parent: &ReviewParent,
    ) -> CoreResult<RatingSummary> {
        let report = rating_summary(parent.field(), parent.id());
        let rows = run_report(store, REVIEWS, &report).await?;

        let row = rows.first();
        let quantity = row
            .and_then(|r| r.get("nRating"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let average = row
            .and_then(|r| r.get("avgRating"))
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_RATING_AVERAGE);
        let summary = RatingSummary {
            ratings_quantity: quantity,
            ratings_average: round_rating(average),
        };

        let mut changes = Document::new();
        changes.insert("ratingsQuantity".into(), json!(summary.ratings_quantity));
        changes.insert("ratingsAverage".into(), json!(summary.ratings_average));
        let updated = store
            .update(parent.collection(), parent.id(), changes)
            .await?;
        if updated.is_none() {
            tracing::warn!(
                collection = parent.collection(),
                parent_id = parent.id(),
                "Review parent missing, rating not persisted"
            );
        }

        tracing::debug!(
            collection = parent.collection(),
            parent_id = parent.id(),
            quantity = summary.ratings_quantity,
            average = summary.ratings_average,
            "Recomputed rating"
        );
        Ok(summary)
    }
}
