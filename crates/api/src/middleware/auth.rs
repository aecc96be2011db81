//! Session extractors for Axum handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tourbook_core::error::CoreError;
use tourbook_db::models::user::User;

use crate::auth::cookie::token_from_headers;
use crate::auth::session::NOT_LOGGED_IN;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user resolved from the session token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from
/// the `jwt` cookie. The user is re-read from the store on every request, so
/// deactivated accounts and tokens older than the last password change are
/// rejected here.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %auth.user.id, role = %auth.user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized(NOT_LOGGED_IN.into())))?;

        let user = state.auth().authenticate(&token).await?;
        Ok(AuthUser { user })
    }
}

/// Optional session for pages that only adapt to a logged-in visitor.
///
/// Any failure (no token, bad token, store hiccup) yields `MaybeUser(None)`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers);
        Ok(MaybeUser(state.auth().probe(token.as_deref()).await))
    }
}
