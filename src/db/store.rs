//! Identity store contract.
//!
//! The session revalidator and account flows only talk to persistence
//! through [`IdentityStore`], so any backend with create/find/update-by-id
//! semantics can sit behind them.

use async_trait::async_trait;
use thiserror::Error;

use super::identity::{Identity, IdentityId, IdentityUpdate, NewIdentity, ValidationError};

/// Infrastructure failure in the identity store.
///
/// Always fatal to the request that hit it and never swallowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Query or transport failure.
    #[error("database error: {0}")]
    Database(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record to write is invalid.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A detached store write could not be joined.
    #[error("store task interrupted: {0}")]
    Interrupted(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(e.to_string())
    }
}

/// Persistent identity store.
///
/// Implementations must allow independent concurrent calls for different
/// identities; no call may block on another identity's request.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create a new identity and return it with its assigned ID.
    ///
    /// The email is normalized before it is stored.
    async fn create(&self, new_identity: &NewIdentity) -> Result<Identity, StoreError>;

    /// Get an identity by ID.
    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;

    /// Get an identity by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Update an identity by ID.
    ///
    /// A new email is normalized before it is stored. Returns false if no
    /// identity has that ID.
    async fn update_by_id(&self, id: IdentityId, update: &IdentityUpdate)
        -> Result<bool, StoreError>;
}
