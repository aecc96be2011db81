//! Route definitions for the `/users` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{auth, users};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST   /signup                 -> signup
/// POST   /login                  -> login
/// GET    /logout                 -> logout
/// POST   /forgotPassword         -> forgot_password
/// PATCH  /resetPassword/{token}  -> reset_password
/// PATCH  /updateMyPassword       -> update_password (auth)
/// GET    /me                     -> me (auth)
/// PATCH  /updateMe               -> update_me (auth)
/// DELETE /deleteMe               -> delete_me (auth)
/// GET    /                       -> list (admin)
/// GET    /{id}                   -> get_one (admin)
/// PATCH  /{id}                   -> update (admin)
/// DELETE /{id}                   -> delete (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgotPassword", post(auth::forgot_password))
        .route("/resetPassword/{token}", patch(auth::reset_password))
        .route("/updateMyPassword", patch(auth::update_password))
        .route("/me", get(users::me))
        .route("/updateMe", patch(users::update_me))
        .route("/deleteMe", axum::routing::delete(users::delete_me))
        .route("/", get(users::list))
        .route(
            "/{id}",
            get(users::get_one)
                .patch(users::update)
                .delete(users::delete),
        )
}
