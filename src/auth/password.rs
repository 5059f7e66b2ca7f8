//! Shared-secret hashing
//!
//! Stored hashes are PHC strings (`$pbkdf2-sha256$i=...,l=32$salt$hash`),
//! so the round count travels with each row and old rows keep verifying
//! after `auth.hash_rounds` changes.

use pbkdf2::{
    Params, Pbkdf2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use thiserror::Error;

const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash secret: {0}")]
    Hash(String),

    #[error("stored hash is not a valid PHC string")]
    MalformedHash,
}

/// Hash `plaintext` with a fresh random salt and `rounds` PBKDF2-SHA256
/// iterations.
pub fn hash_secret(plaintext: &str, rounds: u32) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let params = Params {
        rounds,
        output_length: OUTPUT_LEN,
    };

    let hash = Pbkdf2
        .hash_password_customized(plaintext.as_bytes(), None, None, params, &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check `plaintext` against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored value cannot
/// be parsed.
pub fn verify_secret(plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::MalformedHash)?;
    Ok(Pbkdf2.verify_password(plaintext.as_bytes(), &parsed).is_ok())
}
