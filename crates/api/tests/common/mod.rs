#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tourbook_api::auth::password::hash_password;
use tourbook_api::config::{AuthConfig, ServerConfig};
use tourbook_api::router::build_app_router;
use tourbook_api::state::AppState;
use tourbook_core::notify::{Notification, Notifier, NotifyError, Template};
use tourbook_core::roles::Role;
use tourbook_core::store::DocumentStore;
use tourbook_core::types::Document;
use tourbook_db::models::user::{CreateUser, User};
use tourbook_db::repositories::UserRepo;
use tourbook_db::MemoryStore;

pub const TEST_PASSWORD: &str = "test-pass-123";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        public_url: "http://localhost:3000".to_string(),
        auth: AuthConfig::with_secret("integration-test-secret"),
    }
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Accepts every notification and keeps it for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Raw reset token from the most recent password-reset email.
    pub fn last_reset_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter()
            .rev()
            .find(|n| n.template == Template::PasswordReset)
            .and_then(|n| n.context.get("url"))
            .and_then(|url| url.rsplit('/').next())
            .map(str::to_string)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Rejects every notification.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<RecordingNotifier>,
}

/// Full application router over an empty in-memory store, with the same
/// middleware stack `main.rs` uses.
pub fn build_test_app() -> TestApp {
    let outbox = Arc::new(RecordingNotifier::default());
    build_test_app_with(Arc::clone(&outbox) as Arc<dyn Notifier>, outbox)
}

/// Like [`build_test_app`], but every notification fails.
pub fn build_failing_app() -> TestApp {
    build_test_app_with(
        Arc::new(FailingNotifier),
        Arc::new(RecordingNotifier::default()),
    )
}

fn build_test_app_with(notifier: Arc<dyn Notifier>, outbox: Arc<RecordingNotifier>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn DocumentStore>,
        config: Arc::new(test_config()),
        notifier,
    };
    TestApp {
        router: build_app_router(state),
        store,
        outbox,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Insert a user with [`TEST_PASSWORD`] straight into the store.
    pub async fn create_user(&self, name: &str, role: Role) -> User {
        let input = CreateUser {
            name: name.to_string(),
            email: format!("{}@test.com", name.to_lowercase()),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role,
        };
        UserRepo::create(self.store.as_ref(), &input).await.unwrap()
    }

    /// Create a user and log in through the API, returning the session token.
    pub async fn login_as(&self, name: &str, role: Role) -> (User, String) {
        let user = self.create_user(name, role).await;
        let response = self
            .send(post_json(
                "/api/v1/users/login",
                json!({ "email": user.email, "password": TEST_PASSWORD }),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();
        (user, token)
    }

    /// Insert a document directly, returning it with its assigned `_id`.
    pub async fn seed(&self, collection: &str, doc: Value) -> Document {
        let Value::Object(map) = doc else {
            panic!("seed documents must be objects");
        };
        self.store.insert(collection, map).await.unwrap()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::GET, uri, token).body(Body::empty()).unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::DELETE, uri, token).body(Body::empty()).unwrap()
}

fn with_json(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    with_json(Method::POST, uri, body, token)
}

pub fn patch_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    with_json(Method::PATCH, uri, body, token)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Collect a response body as JSON (`Null` for an empty body).
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
