//! Handlers for profile self-service (`/users/me`, `updateMe`, `deleteMe`)
//! and admin user management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tourbook_core::error::CoreError;
use tourbook_core::params::RawParams;
use tourbook_core::query::FilterSpec;
use tourbook_core::roles::Role;
use tourbook_core::types::Document;
use tourbook_db::models::user::{UpdateUser, UserResponse};
use tourbook_db::repositories::UserRepo;
use validator::Validate;

use super::resources::{delete_document, fetch_visible, list_documents, not_found, QueryPairs};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::authorize;
use crate::resources::{ResourceKind, Users};
use crate::response::{named, DataResponse, ListResponse};
use crate::state::AppState;

/// Stored user fields never sent to clients.
pub const HIDDEN_USER_FIELDS: [&str; 6] = [
    "password",
    "passwordChangedAt",
    "passwordResetToken",
    "passwordResetExpires",
    "active",
    "deactivatedAt",
];

const NOT_FOR_PASSWORDS: &str =
    "This route is not for password updates. Please use /updateMyPassword.";

fn redact(mut doc: Document) -> Document {
    for field in HIDDEN_USER_FIELDS {
        doc.remove(field);
    }
    doc
}

fn user_payload(user: &tourbook_db::models::user::User) -> AppResult<Document> {
    let value = serde_json::to_value(UserResponse::from(user))
        .map_err(|e| AppError::InternalError(format!("user serialization: {e}")))?;
    Ok(named("user", value))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `PATCH /users/updateMe`. Only `name`, `email` and `photo` are
/// applied; anything else in the body is ignored, except password fields,
/// which are rejected.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, message = "Please tell us your name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub photo: Option<String>,
    pub password: Option<Value>,
    pub password_confirm: Option<Value>,
}

impl UpdateMeRequest {
    fn into_update(self) -> AppResult<UpdateUser> {
        if self.password.is_some() || self.password_confirm.is_some() {
            return Err(AppError::Core(CoreError::Validation(NOT_FOR_PASSWORDS.into())));
        }
        self.validate()
            .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
        Ok(UpdateUser {
            name: self.name,
            email: self.email,
            photo: self.photo,
            role: None,
        })
    }
}

/// Body of `PATCH /users/{id}` (admin).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
    pub password: Option<Value>,
    pub password_confirm: Option<Value>,
}

// ---------------------------------------------------------------------------
// Self-service
// ---------------------------------------------------------------------------

/// GET /api/v1/users/me
pub async fn me(auth: AuthUser) -> AppResult<Json<DataResponse<Document>>> {
    Ok(Json(DataResponse::new(user_payload(&auth.user)?)))
}

/// PATCH /api/v1/users/updateMe
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<UpdateMeRequest>,
) -> AppResult<Json<DataResponse<Document>>> {
    let changes = input.into_update()?;
    let user = UserRepo::update(state.store.as_ref(), &auth.user.id, &changes)
        .await?
        .ok_or_else(|| not_found(&Users::DEF, &auth.user.id))?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(DataResponse::new(user_payload(&user)?)))
}

/// DELETE /api/v1/users/deleteMe
///
/// Soft delete: the account is deactivated and disappears from login,
/// session checks and listings.
pub async fn delete_me(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    UserRepo::deactivate(state.store.as_ref(), &auth.user.id).await?;
    tracing::info!(user_id = %auth.user.id, "Account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    authorize(Users::DEF.list, session)?;
    let raw = RawParams::from_pairs(pairs);
    let rows = list_documents(&state, &Users::DEF, &raw, &FilterSpec::new()).await?;
    Ok(Json(ListResponse::new(rows.into_iter().map(redact).collect())))
}

/// GET /api/v1/users/{id}
pub async fn get_one(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Document>>> {
    authorize(Users::DEF.read, session)?;
    let doc = fetch_visible(&state, &Users::DEF, &id).await?;
    Ok(Json(DataResponse::new(named("user", redact(doc)))))
}

/// PATCH /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
    Json(input): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<DataResponse<Document>>> {
    authorize(Users::DEF.modify, session)?;
    if input.password.is_some() || input.password_confirm.is_some() {
        return Err(AppError::Core(CoreError::Validation(NOT_FOR_PASSWORDS.into())));
    }
    fetch_visible(&state, &Users::DEF, &id).await?;

    let changes = UpdateUser {
        name: input.name,
        email: input.email,
        photo: input.photo,
        role: input.role,
    };
    let user = UserRepo::update(state.store.as_ref(), &id, &changes)
        .await?
        .ok_or_else(|| not_found(&Users::DEF, &id))?;
    tracing::info!(user_id = %user.id, role = %user.role, "User updated by admin");
    Ok(Json(DataResponse::new(user_payload(&user)?)))
}

/// DELETE /api/v1/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    authorize(Users::DEF.modify, session)?;
    delete_document(&state, &Users::DEF, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn update_me_rejects_password_fields() {
        let input = UpdateMeRequest {
            password: Some(json!("hunter22")),
            ..UpdateMeRequest::default()
        };
        assert!(matches!(
            input.into_update(),
            Err(AppError::Core(CoreError::Validation(msg))) if msg == NOT_FOR_PASSWORDS
        ));
    }

    #[test]
    fn update_me_never_touches_role() {
        let input: UpdateMeRequest =
            serde_json::from_value(json!({ "name": "Ada", "role": "admin" })).unwrap();
        let changes = input.into_update().unwrap();
        assert_eq!(changes.name.as_deref(), Some("Ada"));
        assert!(changes.role.is_none());
    }

    #[test]
    fn redact_drops_credentials() {
        let doc = json!({ "_id": "u1", "name": "Ada", "password": "h", "active": true });
        let cleaned = redact(doc.as_object().cloned().unwrap());
        assert!(cleaned.contains_key("name"));
        assert!(!cleaned.contains_key("password"));
        assert!(!cleaned.contains_key("active"));
    }
}
