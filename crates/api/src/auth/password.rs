//! Password hashing for stored credentials.
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$...`), so the salt and
//! cost parameters travel with the hash and old hashes keep verifying if the
//! defaults change.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

fn argon2() -> Argon2<'static> {
    Argon2::default()
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Check `password` against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only an unreadable hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored)?;
    match argon2().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Spend one verification on a throwaway hash.
///
/// Login calls this when the email is unknown, so that path costs the same
/// as a wrong password.
pub fn dummy_verify(password: &str) {
    static THROWAWAY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(hash) = THROWAWAY.get_or_init(|| hash_password("tourbook-throwaway").ok()) {
        let _ = verify_password(password, hash);
    }
}

/// Length rule for new passwords, counted in characters.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() >= min_length {
        Ok(())
    } else {
        Err(format!("Password must be at least {min_length} characters long"))
    }
}
