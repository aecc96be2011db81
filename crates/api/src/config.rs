use std::fmt::Display;
use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Read `key` and parse it, falling back to `default` when unset.
///
/// Panics on an unparsable value; configuration is read once at startup.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| matches!(v.trim(), "true" | "1"))
}

/// Process-wide settings, loaded once and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
    /// Upper bound on one request, store calls included.
    pub request_timeout_secs: u64,
    /// Postgres URL. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// Base URL for links in emails, without a trailing slash.
    pub public_url: String,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// | Env Var                | Default                        |
    /// |------------------------|--------------------------------|
    /// | `HOST`                 | `0.0.0.0`                      |
    /// | `PORT`                 | `3000`                         |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                           |
    /// | `DATABASE_URL`         | unset (in-memory store)        |
    /// | `PUBLIC_URL`           | `http://localhost:{PORT}`      |
    pub fn from_env() -> Self {
        let port = env_parse("PORT", 3000u16);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let config = Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30u64),
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            public_url,
            auth: AuthConfig::from_env(),
        };
        if let Err(msg) = config.check_timeouts() {
            panic!("{msg}");
        }
        config
    }

    /// The notifier must give up before the request does, otherwise the
    /// request timeout fires first and the caller never sees the failure.
    pub fn check_timeouts(&self) -> Result<(), String> {
        if self.auth.notifier_timeout_secs >= self.request_timeout_secs {
            return Err(format!(
                "NOTIFIER_TIMEOUT_SECS ({}) must be below REQUEST_TIMEOUT_SECS ({})",
                self.auth.notifier_timeout_secs, self.request_timeout_secs
            ));
        }
        Ok(())
    }
}

const DEFAULT_COOKIE_EXPIRY_DAYS: i64 = 3;
const DEFAULT_RESET_EXPIRY_MINS: i64 = 15;
const DEFAULT_NOTIFIER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Lifetime of the placeholder cookie written on logout.
pub const LOGOUT_COOKIE_SECS: i64 = 10;

/// Settings owned by the session manager.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    pub cookie_expires_in_days: i64,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
    /// How long an emailed reset token stays usable.
    pub reset_token_expiry_mins: i64,
    /// Bound on a single notifier call. A timeout counts as a failed send.
    pub notifier_timeout_secs: u64,
    pub min_password_length: usize,
}

impl AuthConfig {
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `JWT_COOKIE_EXPIRES_IN_DAYS`  | `3`     |
    /// | `COOKIE_SECURE`               | `false` |
    /// | `PASSWORD_RESET_EXPIRY_MINS`  | `15`    |
    /// | `NOTIFIER_TIMEOUT_SECS`       | `10`    |
    /// | `MIN_PASSWORD_LENGTH`         | `8`     |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig::from_env(),
            cookie_expires_in_days: env_parse("JWT_COOKIE_EXPIRES_IN_DAYS", DEFAULT_COOKIE_EXPIRY_DAYS),
            cookie_secure: env_flag("COOKIE_SECURE"),
            reset_token_expiry_mins: env_parse("PASSWORD_RESET_EXPIRY_MINS", DEFAULT_RESET_EXPIRY_MINS),
            notifier_timeout_secs: env_parse("NOTIFIER_TIMEOUT_SECS", DEFAULT_NOTIFIER_TIMEOUT_SECS),
            min_password_length: env_parse("MIN_PASSWORD_LENGTH", DEFAULT_MIN_PASSWORD_LENGTH),
        }
    }

    /// Defaults with the given signing secret, for tests and tooling.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt: JwtConfig::new(secret),
            cookie_expires_in_days: DEFAULT_COOKIE_EXPIRY_DAYS,
            cookie_secure: false,
            reset_token_expiry_mins: DEFAULT_RESET_EXPIRY_MINS,
            notifier_timeout_secs: DEFAULT_NOTIFIER_TIMEOUT_SECS,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}
