//! Shared response envelope types for API handlers.
//!
//! Successful responses carry `status: "success"`. Lists add a `results`
//! count; single resources nest the document under its singular name.

use serde::Serialize;
use serde_json::Value;
use tourbook_core::types::Document;
use tourbook_db::models::user::UserResponse;

pub const SUCCESS: &str = "success";

/// `{ "status": "success", "data": T }` envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse::new(named("tour", doc))))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: SUCCESS,
            data,
        }
    }
}

/// `{ "status": "success", "results": n, "data": [...] }` envelope for list endpoints.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub status: &'static str,
    pub results: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            status: SUCCESS,
            results: data.len(),
            data,
        }
    }
}

/// `{ "status": "success", "token": "...", "data": { "user": {...} } }`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn new(token: String, user: UserResponse) -> Self {
        Self {
            status: SUCCESS,
            token,
            data: UserData { user },
        }
    }
}

/// `{ name: value }`, the payload shape of single-resource responses.
pub fn named(name: &str, value: impl Into<Value>) -> Document {
    let mut map = Document::new();
    map.insert(name.to_string(), value.into());
    map
}
