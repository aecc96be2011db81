//! Handlers for the credential lifecycle under `/users` plus the session probe.
//!
//! Every successful credential operation answers with the token in the body
//! and in an HTTP-only `jwt` cookie.

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tourbook_db::models::user::UserResponse;

use crate::auth::session::{
    ResetPasswordRequest, Session, SignupRequest, UpdatePasswordRequest,
};
use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, MaybeUser};
use crate::response::{DataResponse, TokenResponse, SUCCESS};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /users/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /users/forgotPassword`.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProbeData {
    pub user: Option<UserResponse>,
}

fn session_response(state: &AppState, status: StatusCode, session: Session) -> Response {
    let cookie = state.auth().session_cookie(&session.token);
    let body = TokenResponse::new(session.token, UserResponse::from(&session.user));
    (status, [(SET_COOKIE, cookie)], Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupRequest>,
) -> AppResult<Response> {
    let session = state.auth().signup(input).await?;
    Ok(session_response(&state, StatusCode::CREATED, session))
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Response> {
    let session = state.auth().login(&input.email, &input.password).await?;
    Ok(session_response(&state, StatusCode::OK, session))
}

/// GET /api/v1/users/logout
///
/// Replaces the session cookie with a placeholder that expires in seconds.
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = state.auth().logout_cookie();
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": SUCCESS })),
    )
        .into_response()
}

/// POST /api/v1/users/forgotPassword
///
/// Answers the same way whether or not the email belongs to an account.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.auth().forgot_password(&input.email).await?;
    Ok(Json(MessageResponse {
        status: SUCCESS,
        message: "Token sent to email!",
    }))
}

/// PATCH /api/v1/users/resetPassword/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Response> {
    let session = state.auth().reset_password(&token, input).await?;
    Ok(session_response(&state, StatusCode::OK, session))
}

/// PATCH /api/v1/users/updateMyPassword
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<UpdatePasswordRequest>,
) -> AppResult<Response> {
    let session = state.auth().update_password(&auth.user.id, input).await?;
    Ok(session_response(&state, StatusCode::OK, session))
}

/// GET /api/v1/session
///
/// Advisory: reports the logged-in user, or `null`, and never fails on a
/// bad or stale token.
pub async fn probe(MaybeUser(user): MaybeUser) -> Json<DataResponse<ProbeData>> {
    Json(DataResponse::new(ProbeData {
        user: user.as_ref().map(UserResponse::from),
    }))
}
