pub mod catalog;
pub mod health;
pub mod reviews;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /session                                         advisory session probe (public)
///
/// /users/signup, /login, /logout                   credential lifecycle (public)
/// /users/forgotPassword, /resetPassword/{token}    password reset (public)
/// /users/updateMyPassword, /me, /updateMe, /deleteMe
///                                                  self-service (auth required)
/// /users, /users/{id}                              admin user management
///
/// /tours                                           list (auth), create (admin, guide)
/// /tours/{id}                                      get (public), update, delete (admin, guide)
/// /tours/top-5-cheap                               alias list
/// /tours/tour-stats                                rating statistics (public)
/// /tours/monthly-plan/{year}                       busiest months (admin)
/// /tours/tours-within/{distance}/center/{latlng}/unit/{unit}
/// /tours/distances/{latlng}/unit/{unit}
/// /tours/{id}/reviews                              nested reviews
///
/// /rooms                                           same shape as tours
/// /rooms/top-5-cheap, /room-stats, /monthly-plan/{year}, /{id}/reviews
///
/// /products, /products/{id}                        read (auth), write (admin)
/// /reviews, /reviews/{id}                          read (auth), create (user), write (user, admin)
/// /bookings, /bookings/{id}                        admin only
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(handlers::auth::probe))
        .nest("/users", users::router())
        .nest("/tours", catalog::tours_router())
        .nest("/rooms", catalog::rooms_router())
        .nest("/products", catalog::products_router())
        .nest("/bookings", catalog::bookings_router())
        .nest("/reviews", reviews::router())
}
