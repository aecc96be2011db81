//! `PgDocumentStore` against a real database, one fresh schema per test.

use assert_matches::assert_matches;
use serde_json::{json, Value};
use sqlx::PgPool;
use tourbook_core::query::{FilterSpec, SortKey};
use tourbook_core::roles::Role;
use tourbook_core::store::{DocumentStore, FindQuery, StoreError};
use tourbook_core::types::Document;
use tourbook_db::collections::{REVIEWS, TOURS};
use tourbook_db::models::user::CreateUser;
use tourbook_db::repositories::UserRepo;
use tourbook_db::PgDocumentStore;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

fn names(rows: &[Document]) -> Vec<&str> {
    rows.iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
        .collect()
}

/// Tours with ascending ids so insertion order is stable under `ORDER BY created_at, id`.
async fn seeded(pool: PgPool) -> PgDocumentStore {
    let store = PgDocumentStore::new(pool);
    let tours = [
        json!({ "_id": "t1", "name": "Forest Hiker", "difficulty": "easy", "price": 397 }),
        json!({ "_id": "t2", "name": "Sea Explorer", "difficulty": "medium", "price": 497 }),
        json!({ "_id": "t3", "name": "Snow Adventurer", "difficulty": "difficult", "price": 997 }),
        json!({ "_id": "t4", "name": "City Wanderer", "difficulty": "easy", "price": 1197 }),
        json!({ "_id": "t5", "name": "Park Camper", "difficulty": "easy", "price": 1497 }),
    ];
    for tour in tours {
        store.insert(TOURS, doc(tour)).await.unwrap();
    }
    store
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_is_rejected(pool: PgPool) {
    let store = PgDocumentStore::new(pool);
    let user = CreateUser {
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        password_hash: "$argon2id$stub".into(),
        role: Role::User,
    };
    let created = UserRepo::create(&store, &user).await.unwrap();

    let dup = UserRepo::create(&store, &user).await;
    assert_matches!(dup, Err(StoreError::Duplicate(_)));

    let found = UserRepo::find_active_by_email(&store, "ADA@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(created.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn one_review_per_user_and_tour(pool: PgPool) {
    let store = PgDocumentStore::new(pool);
    let review = json!({ "review": "Great guide", "rating": 5, "tour": "t1", "user": "u1" });
    store.insert(REVIEWS, doc(review.clone())).await.unwrap();

    let dup = store.insert(REVIEWS, doc(review)).await;
    assert_matches!(dup, Err(StoreError::Duplicate(_)));

    let other_tour = json!({ "review": "Fine", "rating": 4, "tour": "t2", "user": "u1" });
    assert!(store.insert(REVIEWS, doc(other_tour)).await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
async fn update_merges_and_persists(pool: PgPool) {
    let store = seeded(pool).await;

    let patch = doc(json!({ "price": 450, "difficulty": null }));
    let updated = store.update(TOURS, "t1", patch).await.unwrap().unwrap();
    assert_eq!(updated["price"], json!(450));
    assert!(!updated.contains_key("difficulty"));

    let reloaded = store.find_by_id(TOURS, "t1").await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
    assert_eq!(reloaded["name"], json!("Forest Hiker"));

    let missing = store.update(TOURS, "nope", Document::new()).await.unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn find_filters_sorts_and_pages(pool: PgPool) {
    let store = seeded(pool).await;

    let easy = FilterSpec::new().eq("difficulty", "easy");
    let query = FindQuery {
        filter: easy.clone(),
        sort: vec![SortKey::desc("price")],
        skip: 1,
        limit: Some(1),
        ..FindQuery::default()
    };
    let rows = store.find(TOURS, &query).await.unwrap();
    assert_eq!(names(&rows), ["City Wanderer"]);

    // Equality only and no sort: paging runs in SQL.
    let query = FindQuery {
        filter: easy.clone(),
        skip: 1,
        limit: Some(5),
        ..FindQuery::default()
    };
    let rows = store.find(TOURS, &query).await.unwrap();
    assert_eq!(names(&rows), ["City Wanderer", "Park Camper"]);

    assert_eq!(store.count(TOURS, &easy).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn text_literals_match_numbers_and_ranges_still_apply(pool: PgPool) {
    let store = seeded(pool).await;

    let by_price = FilterSpec::new().eq("price", "997");
    let rows = store.find(TOURS, &FindQuery::new(by_price)).await.unwrap();
    assert_eq!(names(&rows), ["Snow Adventurer"]);

    let easy_and_cheap = FilterSpec::new()
        .eq("difficulty", "easy")
        .op("price", "$lt", "1200");
    assert_eq!(store.count(TOURS, &easy_and_cheap).await.unwrap(), 2);

    let first = store.find_one(TOURS, &easy_and_cheap).await.unwrap().unwrap();
    assert_eq!(first["name"], json!("Forest Hiker"));
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_operator_is_rejected_even_without_matches(pool: PgPool) {
    let store = seeded(pool).await;
    let filter = FilterSpec::new()
        .eq("difficulty", "impossible")
        .op("price", "between", "1");
    assert_matches!(
        store.find(TOURS, &FindQuery::new(filter)).await,
        Err(StoreError::InvalidQuery(_))
    );
}
