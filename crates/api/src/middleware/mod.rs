//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the session token (Bearer header or `jwt` cookie) to an active user.
//! - [`auth::MaybeUser`] -- Same resolution, but never rejects.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.

pub mod auth;
pub mod rbac;
