//! Review parent resolution and rating aggregates.

use serde::Serialize;
use serde_json::Value;
use tourbook_core::types::{DocId, Document};

use crate::collections::{ROOMS, TOURS};

/// The tour or room a review belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewParent {
    Tour(DocId),
    Room(DocId),
}

impl ReviewParent {
    /// Parent referenced by a review document; `tour` wins when both are set.
    pub fn of(review: &Document) -> Option<Self> {
        let id = |field: &str| review.get(field).and_then(Value::as_str).map(str::to_string);
        id("tour")
            .map(ReviewParent::Tour)
            .or_else(|| id("room").map(ReviewParent::Room))
    }

    /// Reference field on the review document.
    pub fn field(&self) -> &'static str {
        match self {
            ReviewParent::Tour(_) => "tour",
            ReviewParent::Room(_) => "room",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            ReviewParent::Tour(_) => TOURS,
            ReviewParent::Room(_) => ROOMS,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ReviewParent::Tour(id) | ReviewParent::Room(id) => id,
        }
    }
}

/// Review statistics persisted on the parent as `ratingsQuantity` / `ratingsAverage`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub ratings_quantity: u64,
    pub ratings_average: f64,
}
