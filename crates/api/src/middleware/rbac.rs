//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role is not
//! on its allow-list. Resource routes with per-operation policies check
//! roles through [`authorize`] instead.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tourbook_core::error::CoreError;
use tourbook_core::roles::{require_role, Role};

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Who may perform an operation on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, logged in or not.
    Public,
    /// Any active user.
    Authenticated,
    /// Only users holding one of these roles.
    Roles(&'static [Role]),
    /// Not exposed over HTTP; documents come from another flow.
    Closed,
}

/// Apply `access` to the outcome of session extraction.
///
/// Public operations ignore a missing or broken session; every other policy
/// surfaces the authentication error first, then checks the role.
pub fn authorize(
    access: Access,
    session: Result<AuthUser, AppError>,
) -> AppResult<Option<AuthUser>> {
    match access {
        Access::Public => Ok(session.ok()),
        Access::Authenticated => session.map(Some),
        Access::Roles(allowed) => {
            let auth = session?;
            require_role(auth.user.role, allowed)?;
            Ok(Some(auth))
        }
        Access::Closed => Err(AppError::Core(CoreError::Forbidden(
            "This operation is not available".into(),
        ))),
    }
}

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(auth): RequireAdmin) -> AppResult<Json<()>> {
///     // auth.user is guaranteed to be an admin here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        require_role(auth.user.role, &[Role::Admin])?;
        Ok(RequireAdmin(auth))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tourbook_db::models::user::User;

    use super::*;

    fn auth_as(role: Role) -> AuthUser {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Test",
            "email": "t@example.com",
            "role": role,
            "password": "$argon2id$placeholder",
        }))
        .unwrap();
        AuthUser { user }
    }

    fn unauthenticated() -> Result<AuthUser, AppError> {
        Err(AppError::Core(CoreError::Unauthorized("no session".into())))
    }

    #[test]
    fn public_ignores_missing_session() {
        assert!(authorize(Access::Public, unauthenticated()).unwrap().is_none());
        assert!(authorize(Access::Public, Ok(auth_as(Role::User))).unwrap().is_some());
    }

    #[test]
    fn authenticated_requires_a_session() {
        assert_matches!(
            authorize(Access::Authenticated, unauthenticated()),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
    }

    #[test]
    fn roles_check_happens_after_authentication() {
        const STAFF: &[Role] = &[Role::Admin, Role::Guide];
        assert_matches!(
            authorize(Access::Roles(STAFF), unauthenticated()),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
        assert_matches!(
            authorize(Access::Roles(STAFF), Ok(auth_as(Role::User))),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
        assert!(authorize(Access::Roles(STAFF), Ok(auth_as(Role::Guide))).is_ok());
    }

    #[test]
    fn closed_operations_refuse_even_admins() {
        assert_matches!(
            authorize(Access::Closed, Ok(auth_as(Role::Admin))),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
    }
}
