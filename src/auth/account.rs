//! Account flows built on the credential engine and the identity store.
//!
//! These are what authentication endpoints call: login, password change, and
//! locking.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use super::password::{authenticate, derive_credentials};
use super::policy::{check_password_policy, PolicyViolation};
use crate::db::{normalize_email, Identity, IdentityId, IdentityStore, IdentityUpdate, StoreError};
use crate::{Result, WardenError};

/// Login errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The identity is locked.
    #[error("account is locked")]
    Locked,

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authenticate by email and password and record the login.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller, as
/// is an identity removed before its login could be recorded.
/// `last_request_at` is not touched, so the first revalidation after login
/// never treats the session as stale.
pub async fn login<S: IdentityStore + ?Sized>(
    store: &S,
    email: &str,
    password: &str,
    ip: Option<&str>,
    now: DateTime<Utc>,
) -> std::result::Result<Identity, LoginError> {
    let Ok(email) = normalize_email(email) else {
        return Err(LoginError::InvalidCredentials);
    };

    let Some(mut identity) = store.find_by_email(&email).await? else {
        warn!(email = %email, "Login failed: identity not found");
        return Err(LoginError::InvalidCredentials);
    };

    if !authenticate(&identity, password) {
        warn!(email = %email, identity_id = identity.id, "Login failed: wrong password");
        return Err(LoginError::InvalidCredentials);
    }

    if identity.is_locked() {
        warn!(email = %email, identity_id = identity.id, "Login failed: identity locked");
        return Err(LoginError::Locked);
    }

    let update = IdentityUpdate::new().last_login(now, ip.map(str::to_string));
    if !store.update_by_id(identity.id, &update).await? {
        warn!(email = %email, identity_id = identity.id, "Login failed: identity vanished");
        return Err(LoginError::InvalidCredentials);
    }
    update.apply_to(&mut identity);

    info!(email = %email, identity_id = identity.id, "Login successful");
    Ok(identity)
}

/// Result of a password change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordChange {
    /// New credentials were persisted.
    Changed,
    /// The new password failed the policy; nothing was written.
    Rejected(PolicyViolation),
}

/// Change an identity's password.
///
/// The policy check runs first. The new salt and hash are persisted together
/// and only set on `identity` once the write succeeds.
pub async fn change_password<S: IdentityStore + ?Sized>(
    store: &S,
    identity: &mut Identity,
    new_password: &str,
    confirmation: Option<&str>,
) -> Result<PasswordChange> {
    if let Err(violation) = check_password_policy(new_password, confirmation) {
        return Ok(PasswordChange::Rejected(violation));
    }

    let credentials = derive_credentials(new_password)?;
    let update = IdentityUpdate::new().credentials(credentials);
    if !store.update_by_id(identity.id, &update).await? {
        return Err(WardenError::NotFound(format!("identity {}", identity.id)));
    }
    update.apply_to(identity);
    identity.password = Some(new_password.to_string());

    info!(identity_id = identity.id, "Password changed");
    Ok(PasswordChange::Changed)
}

/// Lock an identity so it can no longer log in.
///
/// Returns false if no identity has that ID.
pub async fn lock<S: IdentityStore + ?Sized>(
    store: &S,
    id: IdentityId,
    by: Option<IdentityId>,
    now: DateTime<Utc>,
) -> std::result::Result<bool, StoreError> {
    let locked = store
        .update_by_id(id, &IdentityUpdate::new().lock(now, by))
        .await?;
    if locked {
        info!(identity_id = id, locked_by = ?by, "Identity locked");
    }
    Ok(locked)
}

/// Unlock an identity.
///
/// Returns false if no identity has that ID.
pub async fn unlock<S: IdentityStore + ?Sized>(
    store: &S,
    id: IdentityId,
) -> std::result::Result<bool, StoreError> {
    let unlocked = store.update_by_id(id, &IdentityUpdate::new().unlock()).await?;
    if unlocked {
        info!(identity_id = id, "Identity unlocked");
    }
    Ok(unlocked)
}
