//! Session manager: credentials, session tokens, password reset and role checks.
//!
//! Flow: `Anonymous -> Authenticated` via signup or login, with an optional
//! `PasswordResetPending` detour through forgot/reset. Tokens are stateless;
//! logout only replaces the client's cookie.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tourbook_core::error::{CoreError, CoreResult};
use tourbook_core::notify::{first_name, Notification, Notifier, NotifyError, Template};
use tourbook_core::roles::{require_role, Role};
use tourbook_core::store::DocumentStore;
use tourbook_core::types::Timestamp;
use tourbook_db::models::user::{CreateUser, User};
use tourbook_db::repositories::UserRepo;
use validator::Validate;

use crate::auth::cookie::{set_cookie, LOGGED_OUT};
use crate::auth::jwt::{generate_session_token, validate_token, TokenFault};
use crate::auth::password::{
    dummy_verify, hash_password, validate_password_strength, verify_password,
};
use crate::auth::reset::{generate_reset_token, hash_reset_token};
use crate::config::{ServerConfig, LOGOUT_COOKIE_SECS};

pub const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";
pub const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";
pub const SESSION_INVALID: &str = "Invalid or expired session. Please log in again.";
pub const RESET_TOKEN_INVALID: &str = "Token is invalid or has expired";
pub const WRONG_CURRENT_PASSWORD: &str = "Your current password is wrong";
pub const EMAIL_DELIVERY_FAILED: &str = "There was an error sending the email. Try again later.";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /users/signup`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Please tell us your name"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

/// Body of `PATCH /users/updateMyPassword`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

/// Body of `PATCH /users/resetPassword/{token}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

/// Why a presented session token was refused. All of them surface as the
/// same [`CoreError::Unauthorized`]; the reason is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    Expired,
    UnknownSubject,
    PasswordChanged,
}

impl TokenRejection {
    pub fn reason(self) -> &'static str {
        match self {
            TokenRejection::Malformed => "bad signature or malformed token",
            TokenRejection::Expired => "token expired",
            TokenRejection::UnknownSubject => "user no longer exists",
            TokenRejection::PasswordChanged => "password changed after token was issued",
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

fn validation(err: validator::ValidationErrors) -> CoreError {
    let messages: Vec<String> = err
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("Invalid {field}"),
            })
        })
        .collect();
    CoreError::Validation(messages.join(". "))
}

fn internal(context: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("{context}: {err}"))
}

/// Everything the reset-email task needs, owned so it can outlive the request.
struct ResetDelivery {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    public_url: String,
    expires: Timestamp,
    timeout: Duration,
}

impl ResetDelivery {
    async fn run(self, user: User) -> CoreResult<()> {
        let store = self.store.as_ref();
        let (token, token_hash) = generate_reset_token();
        UserRepo::set_reset_token(store, &user.id, &token_hash, self.expires).await?;

        let notification = Notification::new(&user.email, Template::PasswordReset)
            .with("firstName", first_name(&user.name))
            .with(
                "url",
                format!("{}/api/v1/users/resetPassword/{token}", self.public_url),
            );

        let outcome = match tokio::time::timeout(self.timeout, self.notifier.send(notification)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout),
        };

        if let Err(e) = outcome {
            tracing::error!(user_id = %user.id, error = %e, "Reset email failed, rolling back token");
            UserRepo::clear_reset_token(store, &user.id).await?;
            return Err(CoreError::Dependency(EMAIL_DELIVERY_FAILED.into()));
        }

        tracing::info!(user_id = %user.id, "Password reset token sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

/// Session manager over the user store and the notifier.
pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    config: Arc<ServerConfig>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    fn notifier_timeout(&self) -> Duration {
        Duration::from_secs(self.config.auth.notifier_timeout_secs)
    }

    fn check_strength(&self, password: &str) -> CoreResult<()> {
        validate_password_strength(password, self.config.auth.min_password_length)
            .map_err(CoreError::Validation)
    }

    fn issue(&self, user: User) -> CoreResult<Session> {
        let token = generate_session_token(&user.id, user.role, &self.config.auth.jwt)
            .map_err(|e| internal("token generation", e))?;
        Ok(Session { user, token })
    }

    /// `Set-Cookie` value carrying a session token.
    pub fn session_cookie(&self, token: &str) -> String {
        let auth = &self.config.auth;
        set_cookie(token, auth.cookie_expires_in_days * 24 * 60 * 60, auth.cookie_secure)
    }

    /// `Set-Cookie` value that replaces the session with a short-lived placeholder.
    pub fn logout_cookie(&self) -> String {
        set_cookie(LOGGED_OUT, LOGOUT_COOKIE_SECS, self.config.auth.cookie_secure)
    }

    /// Create an account (always `user` role), issue a session and send the
    /// welcome email in the background.
    pub async fn signup(&self, input: SignupRequest) -> CoreResult<Session> {
        input.validate().map_err(validation)?;
        self.check_strength(&input.password)?;

        let password_hash =
            hash_password(&input.password).map_err(|e| internal("password hashing", e))?;
        let user = UserRepo::create(
            self.store(),
            &CreateUser {
                name: input.name,
                email: input.email,
                password_hash,
                role: Role::User,
            },
        )
        .await?;
        tracing::info!(user_id = %user.id, "User signed up");

        self.send_welcome(&user);
        self.issue(user)
    }

    /// Fire-and-forget welcome message; failures are logged, never surfaced.
    fn send_welcome(&self, user: &User) {
        let notification = Notification::new(&user.email, Template::Welcome)
            .with("firstName", first_name(&user.name))
            .with("url", format!("{}/me", self.config.public_url));
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.notifier_timeout();
        let user_id = user.id.clone();

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, notifier.send(notification)).await {
                Ok(result) => result,
                Err(_) => Err(NotifyError::Timeout),
            };
            if let Err(e) = outcome {
                tracing::warn!(user_id = %user_id, error = %e, "Welcome email failed");
            }
        });
    }

    /// Verify credentials. Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> CoreResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CoreError::Validation(
                "Please provide email and password".into(),
            ));
        }

        let Some(user) = UserRepo::find_active_by_email(self.store(), email).await? else {
            dummy_verify(password);
            return Err(CoreError::Unauthorized(INCORRECT_CREDENTIALS.into()));
        };

        let valid = verify_password(password, &user.password_hash)
            .map_err(|e| internal("password verification", e))?;
        if !valid {
            tracing::info!(user_id = %user.id, "Login rejected");
            return Err(CoreError::Unauthorized(INCORRECT_CREDENTIALS.into()));
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    /// Resolve a session token to its active user.
    ///
    /// Rejects bad signatures, expired tokens, vanished or deactivated users,
    /// and tokens issued before the user's last password change.
    pub async fn authenticate(&self, token: &str) -> CoreResult<User> {
        match self.resolve(token).await? {
            Ok(user) => Ok(user),
            Err(rejection) => {
                tracing::debug!(reason = rejection.reason(), "Session token rejected");
                Err(CoreError::Unauthorized(SESSION_INVALID.into()))
            }
        }
    }

    /// Store failures stay errors; token problems become a [`TokenRejection`].
    pub async fn resolve(&self, token: &str) -> CoreResult<Result<User, TokenRejection>> {
        let claims = match validate_token(token, &self.config.auth.jwt) {
            Ok(claims) => claims,
            Err(TokenFault::Expired) => return Ok(Err(TokenRejection::Expired)),
            Err(TokenFault::Invalid) => return Ok(Err(TokenRejection::Malformed)),
        };

        let Some(user) = UserRepo::find_active_by_id(self.store(), &claims.sub).await? else {
            return Ok(Err(TokenRejection::UnknownSubject));
        };
        if user.changed_password_after(claims.iat_ms) {
            return Ok(Err(TokenRejection::PasswordChanged));
        }
        Ok(Ok(user))
    }

    /// Advisory check for pages that merely adapt to a logged-in user.
    /// Never fails: any problem degrades to anonymous.
    pub async fn probe(&self, token: Option<&str>) -> Option<User> {
        let token = token?;
        match self.resolve(token).await {
            Ok(Ok(user)) => Some(user),
            Ok(Err(rejection)) => {
                tracing::debug!(reason = rejection.reason(), "Probe treated as anonymous");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Probe lookup failed, treating as anonymous");
                None
            }
        }
    }

    /// Check `user`'s role against the allow-list.
    pub fn require_role(&self, user: &User, allowed: &[Role]) -> CoreResult<()> {
        require_role(user.role, allowed)
    }

    /// Issue a reset token and email it.
    ///
    /// Unknown or deactivated emails succeed silently. If delivery fails or
    /// times out, the stored token is cleared again and the failure surfaced.
    /// Storing, sending and rolling back run on their own task, so a dropped
    /// request still finishes the rollback.
    pub async fn forgot_password(&self, email: &str) -> CoreResult<()> {
        let Some(user) = UserRepo::find_active_by_email(self.store(), email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        let delivery = ResetDelivery {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            public_url: self.config.public_url.clone(),
            expires: Utc::now() + chrono::Duration::minutes(self.config.auth.reset_token_expiry_mins),
            timeout: self.notifier_timeout(),
        };
        tokio::spawn(delivery.run(user))
            .await
            .map_err(|e| internal("reset delivery task", e))?
    }

    /// Consume a reset token, set the new password and log the user in.
    pub async fn reset_password(&self, raw_token: &str, input: ResetPasswordRequest) -> CoreResult<Session> {
        let token_hash = hash_reset_token(raw_token);
        let Some(user) = UserRepo::find_by_reset_token(self.store(), &token_hash, Utc::now()).await? else {
            return Err(CoreError::InvalidToken(RESET_TOKEN_INVALID.into()));
        };

        input.validate().map_err(validation)?;
        self.check_strength(&input.password)?;

        let user = self.replace_password(&user, &input.password).await?;
        tracing::info!(user_id = %user.id, "Password reset");
        self.issue(user)
    }

    /// Change the password of a logged-in user after re-checking the current one.
    pub async fn update_password(&self, user_id: &str, input: UpdatePasswordRequest) -> CoreResult<Session> {
        let user = UserRepo::find_active_by_id(self.store(), user_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized(SESSION_INVALID.into()))?;

        let current_ok = verify_password(&input.password_current, &user.password_hash)
            .map_err(|e| internal("password verification", e))?;
        if !current_ok {
            return Err(CoreError::Unauthorized(WRONG_CURRENT_PASSWORD.into()));
        }

        input.validate().map_err(validation)?;
        self.check_strength(&input.password)?;

        let user = self.replace_password(&user, &input.password).await?;
        tracing::info!(user_id = %user.id, "Password updated");
        self.issue(user)
    }

    async fn replace_password(&self, user: &User, password: &str) -> CoreResult<User> {
        let password_hash = hash_password(password).map_err(|e| internal("password hashing", e))?;
        UserRepo::set_password(self.store(), &user.id, &password_hash, Utc::now())
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "user",
                id: user.id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tourbook_db::MemoryStore;

    use super::*;
    use crate::config::AuthConfig;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transport("smtp down".into()));
            }
            self.sent.lock().unwrap().push(notification);
            Ok(())
        }
    }

    fn service(outbox: Arc<Outbox>) -> AuthService {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            database_url: None,
            public_url: "http://test.local".into(),
            auth: AuthConfig::with_secret("session-test-secret"),
        };
        AuthService::new(
            Arc::new(MemoryStore::new()),
            outbox,
            Arc::new(config),
        )
    }

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: "Ada Lovelace".into(),
            email: email.into(),
            password: password.into(),
            password_confirm: password.into(),
        }
    }

    fn reset_url_token(outbox: &Outbox) -> String {
        let sent = outbox.sent.lock().unwrap();
        let reset = sent
            .iter()
            .rev()
            .find(|n| n.template == Template::PasswordReset)
            .expect("reset email sent");
        let url = &reset.context["url"];
        url.rsplit('/').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn signup_then_login_resolves_same_user() {
        let auth = service(Arc::new(Outbox::default()));
        let created = auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();
        assert_eq!(created.user.role, Role::User);

        let session = auth.login("ADA@example.com", "pass1234").await.unwrap();
        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, created.user.id);
    }

    #[tokio::test]
    async fn signup_rejects_mismatched_confirmation() {
        let auth = service(Arc::new(Outbox::default()));
        let mut input = signup_request("ada@example.com", "pass1234");
        input.password_confirm = "pass12345".into();
        assert_matches!(auth.signup(input).await, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let auth = service(Arc::new(Outbox::default()));
        let result = auth.signup(signup_request("ada@example.com", "short")).await;
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service(Arc::new(Outbox::default()));
        auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();
        let again = auth.signup(signup_request("ada@example.com", "pass1234")).await;
        assert_matches!(again, Err(CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_fail_identically() {
        let auth = service(Arc::new(Outbox::default()));
        auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();

        let wrong_password = auth.login("ada@example.com", "nope-nope").await.unwrap_err();
        let unknown_email = auth.login("bob@example.com", "pass1234").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_matches!(wrong_password, CoreError::Unauthorized(_));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let auth = service(Arc::new(Outbox::default()));
        assert_matches!(
            auth.authenticate("not-a-jwt").await,
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(
            auth.resolve("not-a-jwt").await,
            Ok(Err(TokenRejection::Malformed))
        );
    }

    #[tokio::test]
    async fn update_password_invalidates_older_tokens() {
        let auth = service(Arc::new(Outbox::default()));
        let first = auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();

        let wrong = auth
            .update_password(
                &first.user.id,
                UpdatePasswordRequest {
                    password_current: "bad-current".into(),
                    password: "newpass99".into(),
                    password_confirm: "newpass99".into(),
                },
            )
            .await;
        assert_matches!(wrong, Err(CoreError::Unauthorized(msg)) if msg == WRONG_CURRENT_PASSWORD);

        let second = auth
            .update_password(
                &first.user.id,
                UpdatePasswordRequest {
                    password_current: "pass1234".into(),
                    password: "newpass99".into(),
                    password_confirm: "newpass99".into(),
                },
            )
            .await
            .unwrap();

        assert_matches!(
            auth.resolve(&first.token).await,
            Ok(Err(TokenRejection::PasswordChanged))
        );
        assert!(auth.authenticate(&second.token).await.is_ok());
        assert!(auth.login("ada@example.com", "newpass99").await.is_ok());
    }

    #[tokio::test]
    async fn reset_flow_is_single_use() {
        let outbox = Arc::new(Outbox::default());
        let auth = service(Arc::clone(&outbox));
        auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();

        auth.forgot_password("ada@example.com").await.unwrap();
        let token = reset_url_token(&outbox);

        let reset = || ResetPasswordRequest {
            password: "fresh-pass".into(),
            password_confirm: "fresh-pass".into(),
        };
        let session = auth.reset_password(&token, reset()).await.unwrap();
        assert!(auth.authenticate(&session.token).await.is_ok());

        assert_matches!(
            auth.reset_password(&token, reset()).await,
            Err(CoreError::InvalidToken(_))
        );
        assert!(auth.login("ada@example.com", "fresh-pass").await.is_ok());
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_sends_nothing() {
        let outbox = Arc::new(Outbox::default());
        let auth = service(Arc::clone(&outbox));
        auth.forgot_password("ghost@example.com").await.unwrap();
        assert!(outbox
            .sent
            .lock()
            .unwrap()
            .iter()
            .all(|n| n.template != Template::PasswordReset));
    }

    #[tokio::test]
    async fn failed_delivery_rolls_back_reset_token() {
        let auth = service(Arc::new(Outbox {
            fail: true,
            ..Outbox::default()
        }));
        let created = auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();

        let result = auth.forgot_password("ada@example.com").await;
        assert_matches!(result, Err(CoreError::Dependency(msg)) if msg == EMAIL_DELIVERY_FAILED);

        let user = UserRepo::find_by_id(auth.store(), &created.user.id)
            .await
            .unwrap()
            .unwrap();
        assert!(user.password_reset_token.is_none());
        assert!(user.password_reset_expires.is_none());
    }

    /// Never answers.
    struct Stalled;

    #[async_trait]
    impl Notifier for Stalled {
        async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn abandoned_request_still_rolls_back_reset_token() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut config = (*service(Arc::new(Outbox::default())).config).clone();
        config.auth.notifier_timeout_secs = 1;
        let auth = AuthService::new(Arc::clone(&store), Arc::new(Stalled), Arc::new(config));

        let user = UserRepo::create(
            store.as_ref(),
            &CreateUser {
                name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                password_hash: hash_password("pass1234").unwrap(),
                role: Role::User,
            },
        )
        .await
        .unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(200), auth.forgot_password("ada@example.com")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let stored = UserRepo::find_by_id(store.as_ref(), &user.id).await.unwrap().unwrap();
        assert!(stored.password_reset_token.is_none());
        assert!(stored.password_reset_expires.is_none());
    }

    #[tokio::test]
    async fn probe_degrades_to_anonymous() {
        let auth = service(Arc::new(Outbox::default()));
        let session = auth.signup(signup_request("ada@example.com", "pass1234")).await.unwrap();

        assert!(auth.probe(None).await.is_none());
        assert!(auth.probe(Some("garbage")).await.is_none());
        assert_eq!(
            auth.probe(Some(&session.token)).await.map(|u| u.id),
            Some(session.user.id)
        );
    }

    #[test]
    fn logout_cookie_is_short_lived() {
        let auth = service(Arc::new(Outbox::default()));
        let cookie = auth.logout_cookie();
        assert!(cookie.starts_with("jwt=loggedout;"));
        assert!(cookie.contains("Max-Age=10"));
    }
}
