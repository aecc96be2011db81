use std::sync::Arc;

use tourbook_core::notify::Notifier;
use tourbook_core::store::DocumentStore;

use crate::auth::session::AuthService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Document store (Postgres or in-memory).
    pub store: Arc<dyn DocumentStore>,
    /// Server configuration, loaded once at startup.
    pub config: Arc<ServerConfig>,
    /// Out-of-band delivery for welcome and password-reset messages.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Session manager bound to this state's store, notifier and auth settings.
    pub fn auth(&self) -> AuthService {
        AuthService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
            Arc::clone(&self.config),
        )
    }
}
