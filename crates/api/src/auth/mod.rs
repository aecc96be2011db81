//! Authentication and authorization primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- session-token generation and validation.
//! - [`reset`] -- single-use password-reset tokens.
//! - [`cookie`] -- the `jwt` session cookie.
//! - [`session`] -- the session manager tying them to the user store.

pub mod cookie;
pub mod jwt;
pub mod password;
pub mod reset;
pub mod session;
