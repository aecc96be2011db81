//! Password-reset tokens.
//!
//! The plaintext token is 32 random bytes, hex encoded, and only ever leaves
//! the server inside the reset email. The user record stores its SHA-256.

use rand::RngCore;
use tourbook_core::hashing::sha256_hex;

/// Random bytes per reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Generate a reset token, returning `(plaintext, sha256_hex_hash)`.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let plaintext: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let hash = hash_reset_token(&plaintext);
    (plaintext, hash)
}

/// Hash a presented reset token for lookup.
pub fn hash_reset_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}
