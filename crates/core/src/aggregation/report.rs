//! Fixed report pipelines and their empty-result defaults.
//!
//! Each [`Report`] pairs a pipeline with the rows returned when the pipeline
//! produces nothing, so an empty collection or an empty time range never
//! surfaces as an error or a missing report.

use serde_json::{json, Value};

use super::{Accumulator, Expr, GeoNear, Group, Pipeline};
use crate::error::CoreResult;
use crate::geo::{DistanceUnit, GeoPoint};
use crate::query::{FilterSpec, Projection, SortKey};
use crate::store::DocumentStore;
use crate::types::Document;

/// Rating a resource carries before its first review.
pub const DEFAULT_RATING_AVERAGE: f64 = 4.5;

/// Monthly plans list at most one row per month.
pub const MONTHS_PER_YEAR: usize = 12;

#[derive(Debug, Clone)]
pub struct Report {
    pub name: &'static str,
    pub pipeline: Pipeline,
    /// Rows returned when the pipeline yields nothing.
    pub default_rows: Vec<Document>,
}

/// Run a report, substituting its documented default on an empty result.
pub async fn run_report(
    store: &dyn DocumentStore,
    collection: &str,
    report: &Report,
) -> CoreResult<Vec<Document>> {
    let rows = store.aggregate(collection, &report.pipeline).await?;
    if rows.is_empty() {
        tracing::debug!(report = report.name, collection, "Report matched nothing, using default");
        return Ok(report.default_rows.clone());
    }
    Ok(rows)
}

/// Round a rating average to one decimal (4.666 -> 4.7).
pub fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Output field names of a rating-statistics report.
struct StatFields {
    count: &'static str,
    ratings: &'static str,
    avg_rating: &'static str,
    avg_price: &'static str,
}

const TOUR_STAT_FIELDS: StatFields = StatFields {
    count: "numTours",
    ratings: "numRatings",
    avg_rating: "avgRating",
    avg_price: "avgPrice",
};

const ROOM_STAT_FIELDS: StatFields = StatFields {
    count: "numberOfRooms",
    ratings: "numberOfRatings",
    avg_rating: "averageRating",
    avg_price: "averagePrice",
};

fn rating_stats(name: &'static str, min_rating: f64, group_field: &str, fields: &StatFields) -> Report {
    let pipeline = Pipeline::new()
        .matching(FilterSpec::new().op("ratingsAverage", "$gte", min_rating))
        .group(
            Group::by(Expr::to_upper(Expr::field(group_field)))
                .with(fields.count, Accumulator::count())
                .with(fields.ratings, Accumulator::Sum(Expr::field("ratingsQuantity")))
                .with(fields.avg_rating, Accumulator::Avg(Expr::field("ratingsAverage")))
                .with(fields.avg_price, Accumulator::Avg(Expr::field("price")))
                .with("minPrice", Accumulator::Min(Expr::field("price")))
                .with("maxPrice", Accumulator::Max(Expr::field("price"))),
        )
        .sort(vec![SortKey::asc(fields.avg_price)]);

    let mut zero = object(json!({ "_id": null, "minPrice": 0, "maxPrice": 0 }));
    for field in [fields.count, fields.ratings, fields.avg_rating, fields.avg_price] {
        zero.insert(field.to_string(), json!(0));
    }

    Report {
        name,
        pipeline,
        default_rows: vec![zero],
    }
}

/// Highly rated tours (`ratingsAverage >= 4.5`) grouped by difficulty.
///
/// Default: one zero-filled summary row with `_id: null`.
pub fn tour_stats() -> Report {
    rating_stats("tour-stats", 4.5, "difficulty", &TOUR_STAT_FIELDS)
}

/// Rooms rated 4 or above grouped by room type.
///
/// Default: one zero-filled summary row with `_id: null`.
pub fn room_stats() -> Report {
    rating_stats("room-stats", 4.0, "type", &ROOM_STAT_FIELDS)
}

/// Busiest months of `year` by start date.
///
/// Unwinds `startDates`, keeps dates inside the year, groups by month with a
/// start count and the pushed names, then sorts busiest first.
/// Default: an empty plan.
pub fn monthly_plan(year: i32, count_field: &str, names_field: &str) -> Report {
    let from = format!("{year:04}-01-01T00:00:00Z");
    let until = format!("{:04}-01-01T00:00:00Z", year + 1);

    let pipeline = Pipeline::new()
        .unwind("startDates")
        .matching(
            FilterSpec::new()
                .op("startDates", "$gte", from)
                .op("startDates", "$lt", until),
        )
        .group(
            Group::by(Expr::month(Expr::field("startDates")))
                .with(count_field, Accumulator::count())
                .with(names_field, Accumulator::Push(Expr::field("name"))),
        )
        .add_field("month", Expr::field("_id"))
        .project(Projection::Exclude(vec!["_id".into()]))
        .sort(vec![SortKey::desc(count_field), SortKey::asc("month")])
        .limit(MONTHS_PER_YEAR);

    Report {
        name: "monthly-plan",
        pipeline,
        default_rows: Vec::new(),
    }
}

/// Review count and average rating for one tour or room.
///
/// Default: `{nRating: 0, avgRating: 4.5}`, the rating of an unreviewed resource.
pub fn rating_summary(parent_field: &str, parent_id: &str) -> Report {
    let pipeline = Pipeline::new()
        .matching(FilterSpec::new().eq(parent_field, parent_id))
        .group(
            Group::by(Expr::field(parent_field))
                .with("nRating", Accumulator::count())
                .with("avgRating", Accumulator::Avg(Expr::field("rating"))),
        );

    Report {
        name: "rating-summary",
        pipeline,
        default_rows: vec![object(json!({
            "_id": parent_id,
            "nRating": 0,
            "avgRating": DEFAULT_RATING_AVERAGE,
        }))],
    }
}

/// Distance from `center` to every document's `startLocation`, nearest first.
///
/// Default: an empty list.
pub fn distances(center: GeoPoint, unit: DistanceUnit) -> Report {
    let pipeline = Pipeline::new()
        .geo_near(GeoNear {
            near: center,
            key: "startLocation".into(),
            distance_field: "distance".into(),
            distance_multiplier: unit.meter_multiplier(),
        })
        .project(Projection::Include(vec!["distance".into(), "name".into()]));

    Report {
        name: "distances",
        pipeline,
        default_rows: Vec::new(),
    }
}
