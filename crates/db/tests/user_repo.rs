//! Credential bookkeeping through `UserRepo`.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use tourbook_core::roles::Role;
use tourbook_core::store::StoreError;
use tourbook_db::models::user::{CreateUser, UpdateUser};
use tourbook_db::repositories::UserRepo;
use tourbook_db::MemoryStore;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        name: "Ada Lovelace".into(),
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        role: Role::User,
    }
}

#[tokio::test]
async fn email_is_normalized_and_unique() {
    let store = MemoryStore::new();
    let user = UserRepo::create(&store, &new_user("  Ada@Example.COM ")).await.unwrap();
    assert_eq!(user.email, "ada@example.com");

    let found = UserRepo::find_active_by_email(&store, "ADA@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let dup = UserRepo::create(&store, &new_user("ada@example.com")).await;
    assert_matches!(dup, Err(StoreError::Duplicate(_)));
}

#[tokio::test]
async fn reset_token_lookup_honours_expiry() {
    let store = MemoryStore::new();
    let user = UserRepo::create(&store, &new_user("ada@example.com")).await.unwrap();
    let now = Utc::now();

    UserRepo::set_reset_token(&store, &user.id, "hash-1", now + Duration::minutes(15))
        .await
        .unwrap();
    let found = UserRepo::find_by_reset_token(&store, "hash-1", now).await.unwrap();
    assert!(found.is_some());

    let later = now + Duration::minutes(16);
    assert!(UserRepo::find_by_reset_token(&store, "hash-1", later).await.unwrap().is_none());
    assert!(UserRepo::find_by_reset_token(&store, "other", now).await.unwrap().is_none());
}

#[tokio::test]
async fn set_password_clears_reset_fields() {
    let store = MemoryStore::new();
    let user = UserRepo::create(&store, &new_user("ada@example.com")).await.unwrap();
    let now = Utc::now();
    UserRepo::set_reset_token(&store, &user.id, "hash-1", now + Duration::minutes(15))
        .await
        .unwrap();

    let updated = UserRepo::set_password(&store, &user.id, "$argon2id$new", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.password_hash, "$argon2id$new");
    assert!(updated.password_reset_token.is_none());
    assert!(updated.password_reset_expires.is_none());
    assert_eq!(
        updated.password_changed_at.map(|t| t.timestamp_millis()),
        Some(now.timestamp_millis())
    );
}

#[tokio::test]
async fn deactivated_users_are_invisible() {
    let store = MemoryStore::new();
    let user = UserRepo::create(&store, &new_user("ada@example.com")).await.unwrap();

    assert!(UserRepo::deactivate(&store, &user.id).await.unwrap());
    assert!(!UserRepo::deactivate(&store, &user.id).await.unwrap());
    assert!(UserRepo::find_active_by_email(&store, "ada@example.com").await.unwrap().is_none());
    assert!(UserRepo::find_active_by_id(&store, &user.id).await.unwrap().is_none());
    assert!(UserRepo::find_by_id(&store, &user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn update_applies_only_given_fields() {
    let store = MemoryStore::new();
    let user = UserRepo::create(&store, &new_user("ada@example.com")).await.unwrap();
    let input = UpdateUser {
        name: Some("Ada King".into()),
        ..UpdateUser::default()
    };
    let updated = UserRepo::update(&store, &user.id, &input).await.unwrap().unwrap();
    assert_eq!(updated.name, "Ada King");
    assert_eq!(updated.email, "ada@example.com");
    assert_eq!(updated.password_hash, user.password_hash);
}
