//! Password hashing and verification for Warden.
//!
//! Uses Argon2id keyed by a per-identity salt. Hashing is deterministic for a
//! given (password, salt) pair, which is what lets [`authenticate`] recompute
//! and compare.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

use crate::db::{Credentials, Identity};

/// Password-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The salt is not a valid B64 salt string.
    #[error("invalid password salt")]
    InvalidSalt,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),
}

/// Create the Argon2 hasher with recommended parameters.
///
/// Parameters:
/// - Memory cost: 64 MB (65536 KiB)
/// - Time cost: 3 iterations
/// - Parallelism: 4 lanes
fn create_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(65536, 3, 4, None)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Generate a fresh salt.
///
/// Drawn from the OS RNG, so every call yields a distinct value.
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).as_str().to_string()
}

/// Hash a password with the given salt.
///
/// Returns a PHC-formatted string. The same inputs always produce the same
/// output.
///
/// # Examples
///
/// ```
/// use warden::auth::{generate_salt, hash_password};
///
/// let salt = generate_salt();
/// let hash = hash_password("Secret1", &salt).unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert_eq!(hash, hash_password("Secret1", &salt).unwrap());
/// ```
pub fn hash_password(password: &str, salt: &str) -> Result<String, PasswordError> {
    let salt = SaltString::from_b64(salt).map_err(|_| PasswordError::InvalidSalt)?;
    let hash = create_argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Generate a salt and hash the password with it.
pub fn derive_credentials(password: &str) -> Result<Credentials, PasswordError> {
    let salt = generate_salt();
    let hashed_password = hash_password(password, &salt)?;
    Ok(Credentials {
        salt,
        hashed_password,
    })
}

/// Set a new password on an in-memory identity.
///
/// Replaces the salt and hash together and keeps the plaintext on this
/// instance only. The returned credentials are what the caller persists.
pub fn set_password(identity: &mut Identity, password: &str) -> Result<Credentials, PasswordError> {
    let credentials = derive_credentials(password)?;
    identity.salt = credentials.salt.clone();
    identity.hashed_password = credentials.hashed_password.clone();
    identity.password = Some(password.to_string());
    Ok(credentials)
}

/// Check a plaintext password against the identity's stored credentials.
///
/// True iff hashing `password` with the identity's salt reproduces its stored
/// hash. The digest comparison is constant-time.
pub fn authenticate(identity: &Identity, password: &str) -> bool {
    if identity.salt.is_empty() || identity.hashed_password.is_empty() {
        return false;
    }

    let Ok(parsed) = PasswordHash::new(&identity.hashed_password) else {
        return false;
    };

    // The stored hash must have been keyed by the stored salt
    if parsed.salt.map(|s| s.as_str()) != Some(identity.salt.as_str()) {
        return false;
    }

    // Parameters come from the parsed hash, not from create_argon2()
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
