//! Route definitions for the catalogue collections: tours, rooms, products
//! and bookings.

use axum::routing::get;
use axum::Router;

use crate::handlers::resources::{self, create, delete, get_one, list, update};
use crate::handlers::{reports, reviews};
use crate::resources::{Bookings, Products, ResourceKind, Rooms, Tours};
use crate::state::AppState;

/// `GET|POST /` and `GET|PATCH|DELETE /{id}` for one resource.
fn crud<R: ResourceKind>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route(
            "/{id}",
            get(get_one::<R>).patch(update::<R>).delete(delete::<R>),
        )
}

/// Routes mounted at `/tours`.
///
/// ```text
/// GET  /top-5-cheap                                      -> top_cheap_tours
/// GET  /tour-stats                                       -> tour_statistics
/// GET  /monthly-plan/{year}                              -> tour_monthly_plan (admin)
/// GET  /tours-within/{distance}/center/{latlng}/unit/{unit} -> tours_within
/// GET  /distances/{latlng}/unit/{unit}                   -> tour_distances
/// GET  /{id}/reviews, POST /{id}/reviews                 -> nested reviews
/// ```
pub fn tours_router() -> Router<AppState> {
    crud::<Tours>()
        .route("/top-5-cheap", get(resources::top_cheap_tours))
        .route("/tour-stats", get(reports::tour_statistics))
        .route("/monthly-plan/{year}", get(reports::tour_monthly_plan))
        .route(
            "/tours-within/{distance}/center/{latlng}/unit/{unit}",
            get(reports::tours_within),
        )
        .route("/distances/{latlng}/unit/{unit}", get(reports::tour_distances))
        .route(
            "/{id}/reviews",
            get(reviews::list_for_tour).post(reviews::create_for_tour),
        )
}

/// Routes mounted at `/rooms`.
///
/// ```text
/// GET  /top-5-cheap              -> top_rooms
/// GET  /room-stats               -> room_statistics
/// GET  /monthly-plan/{year}      -> room_monthly_plan (admin)
/// GET  /{id}/reviews, POST /{id}/reviews
/// ```
pub fn rooms_router() -> Router<AppState> {
    crud::<Rooms>()
        .route("/top-5-cheap", get(resources::top_rooms))
        .route("/room-stats", get(reports::room_statistics))
        .route("/monthly-plan/{year}", get(reports::room_monthly_plan))
        .route(
            "/{id}/reviews",
            get(reviews::list_for_room).post(reviews::create_for_room),
        )
}

/// Routes mounted at `/products`.
pub fn products_router() -> Router<AppState> {
    crud::<Products>()
}

/// Routes mounted at `/bookings`.
pub fn bookings_router() -> Router<AppState> {
    crud::<Bookings>()
}
