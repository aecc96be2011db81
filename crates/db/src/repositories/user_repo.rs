//! Repository for the `users` collection.

use serde_json::{json, Value};
use tourbook_core::query::FilterSpec;
use tourbook_core::store::{DocumentStore, StoreError};
use tourbook_core::types::{Document, Timestamp};

use crate::collections::USERS;
use crate::document::now_rfc3339;
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User, DEFAULT_PHOTO};

/// Filter shared by every lookup that must ignore deactivated accounts.
pub fn active_users() -> FilterSpec {
    FilterSpec::new().op("active", "$ne", false)
}

fn instant(ts: Timestamp) -> Value {
    Value::String(ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

fn patch(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn decode(doc: Document) -> Result<User, StoreError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StoreError::Backend(format!("corrupt user document: {e}")))
}

fn decode_opt(doc: Option<Document>) -> Result<Option<User>, StoreError> {
    doc.map(decode).transpose()
}

/// Provides credential and profile operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the stored record.
    pub async fn create(store: &dyn DocumentStore, input: &CreateUser) -> Result<User, StoreError> {
        let doc = patch(json!({
            "name": input.name.trim(),
            "email": normalize_email(&input.email),
            "photo": DEFAULT_PHOTO,
            "role": input.role,
            "password": input.password_hash,
            "active": true,
        }));
        decode(store.insert(USERS, doc).await?)
    }

    /// Find a user by id, including deactivated accounts.
    pub async fn find_by_id(store: &dyn DocumentStore, id: &str) -> Result<Option<User>, StoreError> {
        decode_opt(store.find_by_id(USERS, id).await?)
    }

    /// Find an active user by id.
    pub async fn find_active_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(Self::find_by_id(store, id).await?.filter(|user| user.active))
    }

    /// Find an active user by email (case-insensitive).
    pub async fn find_active_by_email(
        store: &dyn DocumentStore,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let filter = active_users().eq("email", normalize_email(email));
        decode_opt(store.find_one(USERS, &filter).await?)
    }

    /// Find the active user holding `token_hash` as an unexpired reset token.
    pub async fn find_by_reset_token(
        store: &dyn DocumentStore,
        token_hash: &str,
        now: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let filter = active_users()
            .eq("passwordResetToken", token_hash)
            .op("passwordResetExpires", "$gt", instant(now));
        decode_opt(store.find_one(USERS, &filter).await?)
    }

    /// Store a reset-token hash and its expiry, replacing any previous token.
    pub async fn set_reset_token(
        store: &dyn DocumentStore,
        id: &str,
        token_hash: &str,
        expires: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let changes = patch(json!({
            "passwordResetToken": token_hash,
            "passwordResetExpires": instant(expires),
        }));
        decode_opt(store.update(USERS, id, changes).await?)
    }

    /// Clear both reset-token fields.
    pub async fn clear_reset_token(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<User>, StoreError> {
        let changes = patch(json!({
            "passwordResetToken": null,
            "passwordResetExpires": null,
        }));
        decode_opt(store.update(USERS, id, changes).await?)
    }

    /// Replace the password hash, stamp `passwordChangedAt` and clear any reset token.
    pub async fn set_password(
        store: &dyn DocumentStore,
        id: &str,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let changes = patch(json!({
            "password": password_hash,
            "passwordChangedAt": instant(changed_at),
            "passwordResetToken": null,
            "passwordResetExpires": null,
        }));
        decode_opt(store.update(USERS, id, changes).await?)
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no user with the given `id` exists.
    pub async fn update(
        store: &dyn DocumentStore,
        id: &str,
        input: &UpdateUser,
    ) -> Result<Option<User>, StoreError> {
        let mut changes = Document::new();
        if let Some(name) = &input.name {
            changes.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(email) = &input.email {
            changes.insert("email".into(), Value::String(normalize_email(email)));
        }
        if let Some(photo) = &input.photo {
            changes.insert("photo".into(), Value::String(photo.clone()));
        }
        if let Some(role) = input.role {
            changes.insert("role".into(), Value::String(role.as_str().into()));
        }
        if changes.is_empty() {
            return Self::find_by_id(store, id).await;
        }
        decode_opt(store.update(USERS, id, changes).await?)
    }

    /// Soft-deactivate a user by setting `active = false`.
    ///
    /// Returns `true` if an active user was deactivated.
    pub async fn deactivate(store: &dyn DocumentStore, id: &str) -> Result<bool, StoreError> {
        let Some(user) = Self::find_active_by_id(store, id).await? else {
            return Ok(false);
        };
        let changes = patch(json!({ "active": false, "deactivatedAt": now_rfc3339() }));
        Ok(store.update(USERS, &user.id, changes).await?.is_some())
    }
}
