//! Statistics and geospatial endpoints for tours and rooms.

use axum::extract::{Path, State};
use axum::Json;
use tourbook_core::aggregation::report::{distances, monthly_plan, room_stats, tour_stats};
use tourbook_core::aggregation::{run_report, Report};
use tourbook_core::error::CoreError;
use tourbook_core::geo::{parse_lat_lng, DistanceUnit};
use tourbook_core::params::RawParams;
use tourbook_core::query::FilterSpec;
use tourbook_core::types::Document;

use super::resources::list_documents;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::resources::{ResourceKind, Rooms, Tours};
use crate::response::{named, DataResponse, ListResponse};
use crate::state::AppState;

/// Years accepted by the monthly plans.
const PLAN_YEARS: std::ops::RangeInclusive<i32> = 1970..=9998;

fn parse_year(raw: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| PLAN_YEARS.contains(year))
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Invalid year '{raw}'. Use a four-digit year"
            )))
        })
}

fn parse_distance(raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Invalid distance '{raw}'"
            )))
        })
}

async fn report_rows(state: &AppState, collection: &str, report: &Report) -> AppResult<Vec<Document>> {
    Ok(run_report(state.store.as_ref(), collection, report).await?)
}

/// GET /api/v1/tours/tour-stats
pub async fn tour_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Document>>> {
    let rows = report_rows(&state, Tours::DEF.collection, &tour_stats()).await?;
    Ok(Json(DataResponse::new(named("stats", rows))))
}

/// GET /api/v1/rooms/room-stats
pub async fn room_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Document>>> {
    let rows = report_rows(&state, Rooms::DEF.collection, &room_stats()).await?;
    Ok(Json(DataResponse::new(named("stats", rows))))
}

/// GET /api/v1/tours/monthly-plan/{year}
///
/// Admin only.
pub async fn tour_monthly_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(year): Path<String>,
) -> AppResult<Json<DataResponse<Document>>> {
    let report = monthly_plan(parse_year(&year)?, "numTourStarts", "tours");
    let rows = report_rows(&state, Tours::DEF.collection, &report).await?;
    Ok(Json(DataResponse::new(named("plan", rows))))
}

/// GET /api/v1/rooms/monthly-plan/{year}
///
/// Admin only.
pub async fn room_monthly_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(year): Path<String>,
) -> AppResult<Json<DataResponse<Document>>> {
    let report = monthly_plan(parse_year(&year)?, "numberOfRoomsStarts", "rooms");
    let rows = report_rows(&state, Rooms::DEF.collection, &report).await?;
    Ok(Json(DataResponse::new(named("plan", rows))))
}

/// GET /api/v1/tours/tours-within/{distance}/center/{latlng}/unit/{unit}
///
/// Tours whose `startLocation` lies within `distance` of `latlng`.
pub async fn tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> AppResult<Json<ListResponse<Document>>> {
    let center = parse_lat_lng(&latlng)?;
    let unit = DistanceUnit::parse(&unit)?;
    let radius = unit.radius_radians(parse_distance(&distance)?);

    let scope = FilterSpec::new().within_sphere("startLocation", center, radius);
    let def = Tours::DEF;
    let rows = list_documents(&state, &def, &RawParams::new(), &scope).await?;
    Ok(Json(ListResponse::new(rows)))
}

/// GET /api/v1/tours/distances/{latlng}/unit/{unit}
///
/// Distance from `latlng` to every tour's start, nearest first.
pub async fn tour_distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Document>>> {
    let center = parse_lat_lng(&latlng)?;
    let unit = DistanceUnit::parse(&unit)?;
    let rows = report_rows(&state, Tours::DEF.collection, &distances(center, unit)).await?;
    Ok(Json(DataResponse::new(named("distances", rows))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_must_be_plausible() {
        assert_eq!(parse_year("2021").unwrap(), 2021);
        assert!(parse_year("twenty").is_err());
        assert!(parse_year("-5").is_err());
    }

    #[test]
    fn distance_must_be_non_negative() {
        assert_eq!(parse_distance("250").unwrap(), 250.0);
        assert!(parse_distance("-1").is_err());
        assert!(parse_distance("far").is_err());
    }
}
