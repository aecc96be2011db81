//! Handlers for reviews, top-level and nested under tours and rooms.
//!
//! Every write is followed by an explicit rating recomputation on the
//! owning tour or room.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tourbook_core::error::CoreError;
use tourbook_core::params::RawParams;
use tourbook_core::query::FilterSpec;
use tourbook_core::roles::Role;
use tourbook_core::types::Document;
use tourbook_db::models::review::ReviewParent;
use tourbook_db::repositories::ReviewRepo;

use super::resources::{
    delete_document, fetch_visible, insert_document, list_documents, update_document,
    writable_body, QueryPairs,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::authorize;
use crate::resources::{ResourceKind, Reviews, Rooms, Tours};
use crate::response::{named, DataResponse, ListResponse};
use crate::state::AppState;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

fn check_review_fields(doc: &Document, creating: bool) -> AppResult<()> {
    match doc.get("review") {
        Some(Value::String(text)) if !text.trim().is_empty() => {}
        None if !creating => {}
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "Review can not be empty!".into(),
            )))
        }
    }
    match doc.get("rating") {
        Some(rating) => match rating.as_f64() {
            Some(r) if (MIN_RATING..=MAX_RATING).contains(&r) => Ok(()),
            _ => Err(AppError::Core(CoreError::Validation(
                "Rating must be between 1 and 5".into(),
            ))),
        },
        None if creating => Err(AppError::Core(CoreError::Validation(
            "A review must have a rating".into(),
        ))),
        None => Ok(()),
    }
}

/// Authors may change their own reviews; admins may change any.
fn ensure_can_modify(auth: &AuthUser, review: &Document) -> AppResult<()> {
    if auth.user.role == Role::Admin {
        return Ok(());
    }
    let author = review.get("user").and_then(Value::as_str);
    if author != Some(auth.user.id.as_str()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only change your own reviews".into(),
        )));
    }
    Ok(())
}

/// The parent must be a visible tour or room; anything else is a 404.
async fn ensure_parent_exists(state: &AppState, parent: &ReviewParent) -> AppResult<()> {
    let parent_def = match parent {
        ReviewParent::Tour(_) => Tours::DEF,
        ReviewParent::Room(_) => Rooms::DEF,
    };
    fetch_visible(state, &parent_def, parent.id()).await?;
    Ok(())
}

async fn refresh_rating(state: &AppState, parent: Option<ReviewParent>) -> AppResult<()> {
    if let Some(parent) = parent {
        let summary = ReviewRepo::recompute_rating(state.store.as_ref(), &parent).await?;
        tracing::debug!(
            collection = parent.collection(),
            parent_id = parent.id(),
            quantity = summary.ratings_quantity,
            average = summary.ratings_average,
            "Rating recomputed",
        );
    }
    Ok(())
}

async fn list_scoped(
    state: &AppState,
    session: Result<AuthUser, AppError>,
    pairs: Vec<(String, String)>,
    scope: FilterSpec,
) -> AppResult<Json<ListResponse<Document>>> {
    let def = Reviews::DEF;
    authorize(def.list, session)?;
    let raw = RawParams::from_pairs(pairs);
    let rows = list_documents(state, &def, &raw, &scope).await?;
    Ok(Json(ListResponse::new(rows)))
}

async fn create_for(
    state: &AppState,
    session: Result<AuthUser, AppError>,
    parent: Option<ReviewParent>,
    body: Value,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let def = Reviews::DEF;
    let auth = authorize(def.create, session)?
        .ok_or_else(|| AppError::InternalError("review author missing".into()))?;

    let mut doc = writable_body(body)?;
    if let Some(parent) = &parent {
        // A nested route owns the parent; body references are ignored.
        doc.remove("tour");
        doc.remove("room");
        doc.insert(parent.field().into(), Value::String(parent.id().to_string()));
    }
    doc.insert("user".into(), Value::String(auth.user.id.clone()));
    check_review_fields(&doc, true)?;
    let Some(owner) = ReviewParent::of(&doc) else {
        return Err(AppError::Core(CoreError::Validation(
            "Review must belong to a tour or a room".into(),
        )));
    };
    ensure_parent_exists(state, &owner).await?;

    let created = insert_document(state, &def, doc).await?;
    refresh_rating(state, ReviewParent::of(&created)).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(named(def.entity, created))),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/reviews
pub async fn list(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    list_scoped(&state, session, pairs, FilterSpec::new()).await
}

/// GET /api/v1/tours/{id}/reviews
pub async fn list_for_tour(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(tour_id): Path<String>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    list_scoped(&state, session, pairs, FilterSpec::new().eq("tour", tour_id)).await
}

/// GET /api/v1/rooms/{id}/reviews
pub async fn list_for_room(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(room_id): Path<String>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    list_scoped(&state, session, pairs, FilterSpec::new().eq("room", room_id)).await
}

/// POST /api/v1/reviews
///
/// The body names its parent with `tour` or `room`.
pub async fn create(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    create_for(&state, session, None, body).await
}

/// POST /api/v1/tours/{id}/reviews
pub async fn create_for_tour(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(tour_id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    create_for(&state, session, Some(ReviewParent::Tour(tour_id)), body).await
}

/// POST /api/v1/rooms/{id}/reviews
pub async fn create_for_room(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(room_id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    create_for(&state, session, Some(ReviewParent::Room(room_id)), body).await
}

/// PATCH /api/v1/reviews/{id}
///
/// Recomputes the rating of the previous parent as well when the review
/// moves to another tour or room.
pub async fn update(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<DataResponse<Document>>> {
    let def = Reviews::DEF;
    let auth = authorize(def.modify, session)?
        .ok_or_else(|| AppError::InternalError("review editor missing".into()))?;

    let existing = fetch_visible(&state, &def, &id).await?;
    ensure_can_modify(&auth, &existing)?;

    let mut patch = writable_body(body)?;
    patch.remove("user");
    check_review_fields(&patch, false)?;

    let before = ReviewParent::of(&existing);
    let mut moved = existing.clone();
    moved.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(target) = ReviewParent::of(&moved).filter(|target| Some(target) != before.as_ref()) {
        ensure_parent_exists(&state, &target).await?;
    }
    let updated = update_document(&state, &def, &id, patch).await?;
    let after = ReviewParent::of(&updated);

    if before != after {
        refresh_rating(&state, before).await?;
    }
    refresh_rating(&state, after).await?;
    Ok(Json(DataResponse::new(named(def.entity, updated))))
}

/// DELETE /api/v1/reviews/{id}
pub async fn delete(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let def = Reviews::DEF;
    let auth = authorize(def.modify, session)?
        .ok_or_else(|| AppError::InternalError("review editor missing".into()))?;

    let existing = fetch_visible(&state, &def, &id).await?;
    ensure_can_modify(&auth, &existing)?;

    let removed = delete_document(&state, &def, &id).await?;
    refresh_rating(&state, ReviewParent::of(&removed)).await?;
    Ok(StatusCode::NO_CONTENT)
}
