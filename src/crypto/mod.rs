/// Password hashing and token material
///
/// Passwords are stored as Argon2id PHC strings. Password-reset tokens are
/// random hex strings of which only the SHA-256 digest is persisted.
use crate::error::{CmsError, CmsResult};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a password-reset token
pub const RESET_TOKEN_BYTES: usize = 32;

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> CmsResult<String> {
    let salt = SaltString::encode_b64(&random_bytes::<16>())
        .map_err(|e| CmsError::Internal(format!("Salt generation failed: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CmsError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> CmsResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CmsError::Internal(format!("Stored password hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CmsError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// New password-reset token (hex, 64 characters)
pub fn generate_reset_token() -> String {
    hex::encode(random_bytes::<RESET_TOKEN_BYTES>())
}

/// Digest stored in place of a reset token
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Unique id embedded in refresh tokens
pub fn generate_token_id() -> String {
    hex::encode(random_bytes::<16>())
}
