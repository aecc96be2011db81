//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use tourbook_core::roles::Role;
use tourbook_core::types::{DocId, Timestamp};

pub const DEFAULT_PHOTO: &str = "default.jpg";

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

fn default_active() -> bool {
    true
}

/// Full user document from the `users` collection.
///
/// Contains the password hash and reset-token hash -- NEVER serialize this to
/// API responses directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
    pub email: String,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub role: Role,
    /// Argon2 PHC string.
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub password_changed_at: Option<Timestamp>,
    /// SHA-256 hex of the outstanding reset token.
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_expires: Option<Timestamp>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl User {
    /// Whether a token issued at `issued_at_ms` (Unix millis) predates the
    /// last password change.
    pub fn changed_password_after(&self, issued_at_ms: i64) -> bool {
        self.password_changed_at
            .is_some_and(|changed| issued_at_ms < changed.timestamp_millis())
    }
}

/// Safe user representation for API responses (no password material).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
    pub created_at: Option<Timestamp>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// DTO for self-service and admin profile updates. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_stored_document_with_defaults() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "__v": 0,
            "name": "Ada",
            "email": "ada@example.com",
            "password": "$argon2id$...",
        }))
        .unwrap();
        assert_eq!(user.photo, DEFAULT_PHOTO);
        assert_eq!(user.role, Role::User);
        assert!(user.active);
        assert!(user.password_changed_at.is_none());
    }

    #[test]
    fn response_omits_password_material() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "password": "hash",
            "passwordResetToken": "abc",
        }))
        .unwrap();
        let body = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(body.get("password").is_none());
        assert!(body.get("passwordResetToken").is_none());
        assert_eq!(body["_id"], "u1");
    }

    #[test]
    fn token_older_than_password_change_is_stale() {
        let changed = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let user = User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            photo: default_photo(),
            role: Role::User,
            password_hash: "hash".into(),
            password_changed_at: Some(changed),
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: None,
        };
        assert!(user.changed_password_after(changed.timestamp_millis() - 1));
        assert!(!user.changed_password_after(changed.timestamp_millis()));
    }
}
