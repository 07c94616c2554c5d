//! Error types for Warden.

use thiserror::Error;

use crate::auth::PasswordError;
use crate::db::{NewIdentityError, StoreError, ValidationError};

/// Common error type for Warden.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Identity store failure.
    ///
    /// Always propagated to the caller unchanged; the request layer decides
    /// whether to retry.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing error.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Validation error for identity input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<NewIdentityError> for WardenError {
    fn from(e: NewIdentityError) -> Self {
        match e {
            NewIdentityError::Validation(e) => WardenError::Validation(e),
            NewIdentityError::Password(e) => WardenError::Password(e),
        }
    }
}

// Migrations and pool setup surface raw sqlx errors
impl From<sqlx::Error> for WardenError {
    fn from(e: sqlx::Error) -> Self {
        WardenError::Store(StoreError::from(e))
    }
}

/// Result type alias for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
