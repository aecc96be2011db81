//! Rating recomputation after review writes.

use serde_json::{json, Value};
use tourbook_core::store::DocumentStore;
use tourbook_core::types::Document;
use tourbook_db::collections::{REVIEWS, TOURS};
use tourbook_db::document::document_id;
use tourbook_db::models::review::ReviewParent;
use tourbook_db::repositories::ReviewRepo;
use tourbook_db::MemoryStore;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn rating_follows_reviews_and_resets_when_none_remain() {
    let store = MemoryStore::new();
    let tour = store
        .insert(TOURS, doc(json!({ "name": "Forest Hiker", "price": 397 })))
        .await
        .unwrap();
    let tour_id = document_id(&tour).unwrap().to_string();
    let parent = ReviewParent::Tour(tour_id.clone());

    let mut review_ids = Vec::new();
    for (user, rating) in [("u1", 5), ("u2", 4), ("u3", 5)] {
        let review = store
            .insert(REVIEWS, doc(json!({ "tour": tour_id, "user": user, "rating": rating, "review": "ok" })))
            .await
            .unwrap();
        review_ids.push(document_id(&review).unwrap().to_string());
    }

    let summary = ReviewRepo::recompute_rating(&store, &parent).await.unwrap();
    assert_eq!(summary.ratings_quantity, 3);
    assert_eq!(summary.ratings_average, 4.7);

    let stored = store.find_by_id(TOURS, &tour_id).await.unwrap().unwrap();
    assert_eq!(stored["ratingsQuantity"], json!(3));
    assert_eq!(stored["ratingsAverage"], json!(4.7));

    for id in &review_ids {
        store.delete(REVIEWS, id).await.unwrap();
    }
    let summary = ReviewRepo::recompute_rating(&store, &parent).await.unwrap();
    assert_eq!(summary.ratings_quantity, 0);
    assert_eq!(summary.ratings_average, 4.5);
}
