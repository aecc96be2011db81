//! Route definitions for the top-level `/reviews` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::{resources, reviews};
use crate::resources::Reviews;
use crate::state::AppState;

/// Routes mounted at `/reviews`.
///
/// ```text
/// GET    /      -> list (auth)
/// POST   /      -> create (user)
/// GET    /{id}  -> get_one (auth)
/// PATCH  /{id}  -> update (user, admin)
/// DELETE /{id}  -> delete (user, admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::list).post(reviews::create))
        .route(
            "/{id}",
            get(resources::get_one::<Reviews>)
                .patch(reviews::update)
                .delete(reviews::delete),
        )
}
