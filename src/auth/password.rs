//! Password hashing and verification
//!
//! Argon2id in PHC string format; the salt is generated per hash and stored
//! inside the PHC string, so the database column holds everything needed to
//! verify later.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::{Error, Result};

/// Hash a plaintext password
///
/// # Errors
///
/// Returns error if hashing fails
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Auth(format!("password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored PHC hash
///
/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
///
/// # Errors
///
/// Returns error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Auth(format!("stored password hash is invalid: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
