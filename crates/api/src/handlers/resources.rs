//! Generic CRUD handlers shared by every document collection.
//!
//! Handlers are generic over a [`ResourceKind`]; the access policy, the
//! visibility filter and the slug rule all come from its [`Resource`]
//! definition. The `pub(crate)` helpers are reused by the review handlers
//! and the list aliases.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tourbook_core::error::CoreError;
use tourbook_core::params::RawParams;
use tourbook_core::query::{execute, FilterSpec, QuerySpec, QueryTrace};
use tourbook_core::slug::slugify;
use tourbook_core::types::{Document, CREATED_AT_FIELD, ID_FIELD, VERSION_FIELD};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::authorize;
use crate::resources::{Resource, ResourceKind, Rooms, Tours};
use crate::response::{named, DataResponse, ListResponse};
use crate::state::AppState;

/// Raw `(key, value)` query pairs, decoded but not yet interpreted.
pub type QueryPairs = Query<Vec<(String, String)>>;

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Fixed list parameters for an alias route. They override whatever the
/// caller sent for the same keys.
#[derive(Debug, Clone, Copy)]
pub struct ListPreset {
    pub limit: &'static str,
    pub sort: &'static str,
    pub fields: &'static str,
}

impl ListPreset {
    pub fn apply(&self, raw: &mut RawParams) {
        raw.set("limit", self.limit);
        raw.set("sort", self.sort);
        raw.set("fields", self.fields);
    }
}

pub const TOP_CHEAP_TOURS: ListPreset = ListPreset {
    limit: "5",
    sort: "-ratingsAverage,price",
    fields: "name,price,ratingsAverage,summary,difficulty,imageCover",
};

pub const TOP_ROOMS: ListPreset = ListPreset {
    limit: "5",
    sort: "-ratingsAverage,-price",
    fields: "name,price,ratingsAverage,summary,type",
};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn not_found(def: &Resource, id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: def.entity,
        id: id.to_string(),
    })
}

/// Accept only JSON objects as write bodies and drop store-managed fields.
pub(crate) fn writable_body(body: Value) -> AppResult<Document> {
    let Value::Object(mut doc) = body else {
        return Err(AppError::BadRequest("Request body must be a JSON object".into()));
    };
    for managed in [ID_FIELD, VERSION_FIELD, CREATED_AT_FIELD] {
        doc.remove(managed);
    }
    Ok(doc)
}

fn apply_slug(def: &Resource, doc: &mut Document) {
    if !def.slug_from_name {
        return;
    }
    if let Some(Value::String(name)) = doc.get("name") {
        let slug = slugify(name);
        doc.insert("slug".into(), Value::String(slug));
    }
}

/// Run a list query for `def`, narrowed by its visibility filter and `scope`.
pub(crate) async fn list_documents(
    state: &AppState,
    def: &Resource,
    raw: &RawParams,
    scope: &FilterSpec,
) -> AppResult<Vec<Document>> {
    let base = def.visible().and(scope);
    let spec = QuerySpec::from_params(raw, &def.defaults)?.restrict(&base);
    let mut trace = QueryTrace::start(def.collection);
    let rows = execute(state.store.as_ref(), def.collection, &spec, &mut trace).await?;
    Ok(rows)
}

/// Load one document, treating hidden documents as missing.
pub(crate) async fn fetch_visible(
    state: &AppState,
    def: &Resource,
    id: &str,
) -> AppResult<Document> {
    let doc = state
        .store
        .find_by_id(def.collection, id)
        .await?
        .ok_or_else(|| not_found(def, id))?;
    if !def.visible().matches(&doc)? {
        return Err(not_found(def, id));
    }
    Ok(doc)
}

pub(crate) async fn insert_document(
    state: &AppState,
    def: &Resource,
    mut doc: Document,
) -> AppResult<Document> {
    apply_slug(def, &mut doc);
    let created = state.store.insert(def.collection, doc).await?;
    let id = created.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default();
    tracing::info!(collection = def.collection, id, "Document created");
    Ok(created)
}

pub(crate) async fn update_document(
    state: &AppState,
    def: &Resource,
    id: &str,
    mut patch: Document,
) -> AppResult<Document> {
    fetch_visible(state, def, id).await?;
    apply_slug(def, &mut patch);
    let updated = state
        .store
        .update(def.collection, id, patch)
        .await?
        .ok_or_else(|| not_found(def, id))?;
    tracing::info!(collection = def.collection, id, "Document updated");
    Ok(updated)
}

pub(crate) async fn delete_document(
    state: &AppState,
    def: &Resource,
    id: &str,
) -> AppResult<Document> {
    fetch_visible(state, def, id).await?;
    let removed = state
        .store
        .delete(def.collection, id)
        .await?
        .ok_or_else(|| not_found(def, id))?;
    tracing::info!(collection = def.collection, id, "Document deleted");
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/{collection}
///
/// Filter, sort, project and paginate via query parameters
/// (`price[gte]=100&sort=-price&fields=name,price&page=2&limit=10`).
pub async fn list<R: ResourceKind>(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    let def = R::DEF;
    authorize(def.list, session)?;
    let raw = RawParams::from_pairs(pairs);
    let rows = list_documents(&state, &def, &raw, &FilterSpec::new()).await?;
    Ok(Json(ListResponse::new(rows)))
}

/// GET /api/v1/{collection}/{id}
pub async fn get_one<R: ResourceKind>(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Document>>> {
    let def = R::DEF;
    authorize(def.read, session)?;
    let doc = fetch_visible(&state, &def, &id).await?;
    Ok(Json(DataResponse::new(named(def.entity, doc))))
}

/// POST /api/v1/{collection}
pub async fn create<R: ResourceKind>(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let def = R::DEF;
    authorize(def.create, session)?;
    let doc = insert_document(&state, &def, writable_body(body)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(named(def.entity, doc))),
    ))
}

/// PATCH /api/v1/{collection}/{id}
pub async fn update<R: ResourceKind>(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<DataResponse<Document>>> {
    let def = R::DEF;
    authorize(def.modify, session)?;
    let doc = update_document(&state, &def, &id, writable_body(body)?).await?;
    Ok(Json(DataResponse::new(named(def.entity, doc))))
}

/// DELETE /api/v1/{collection}/{id}
pub async fn delete<R: ResourceKind>(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let def = R::DEF;
    authorize(def.modify, session)?;
    delete_document(&state, &def, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_preset(
    state: &AppState,
    def: &Resource,
    session: Result<AuthUser, AppError>,
    pairs: Vec<(String, String)>,
    preset: &ListPreset,
) -> AppResult<Json<ListResponse<Document>>> {
    authorize(def.list, session)?;
    let mut raw = RawParams::from_pairs(pairs);
    preset.apply(&mut raw);
    let rows = list_documents(state, def, &raw, &FilterSpec::new()).await?;
    Ok(Json(ListResponse::new(rows)))
}

/// GET /api/v1/tours/top-5-cheap
pub async fn top_cheap_tours(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    list_preset(&state, &Tours::DEF, session, pairs, &TOP_CHEAP_TOURS).await
}

/// GET /api/v1/rooms/top-5-cheap
pub async fn top_rooms(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    Query(pairs): QueryPairs,
) -> AppResult<Json<ListResponse<Document>>> {
    list_preset(&state, &Rooms::DEF, session, pairs, &TOP_ROOMS).await
}
