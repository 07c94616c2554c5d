//! Session revalidation for Warden.
//!
//! The web session middleware stores only an identity ID in the session and
//! calls back into this module on every request to turn that ID back into an
//! identity. Missing and expired sessions resolve to an anonymous request;
//! only store failures are errors.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::db::{Identity, IdentityId, IdentityStore, IdentityUpdate, StoreError};

/// Why a session resolved to no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    /// No identity has the session's ID.
    NotFound,
    /// The identity was idle longer than the session timeout.
    Expired,
    /// The identity disappeared between lookup and refresh.
    Vanished,
}

/// Outcome of revalidating a session.
#[derive(Debug, Clone)]
pub enum SessionUser {
    /// The session belongs to this identity, with `last_request_at` refreshed.
    Authenticated(Identity),
    /// The request proceeds without an identity.
    Anonymous(AnonymousReason),
}

impl SessionUser {
    /// The identity, if the session resolved to one.
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            SessionUser::Authenticated(identity) => Some(identity),
            SessionUser::Anonymous(_) => None,
        }
    }

    /// Check if the session resolved to an identity.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionUser::Authenticated(_))
    }
}

/// Check if a session has been idle longer than `timeout`.
///
/// A missing `last_request_at` means no request since login, which is never
/// stale.
pub fn is_stale(
    last_request_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    timeout: Duration,
) -> bool {
    match last_request_at {
        Some(last) => now - last > timeout,
        None => false,
    }
}

/// Per-request session hooks backed by an identity store.
///
/// Holds no identity state between calls; every lookup goes to the store.
pub struct SessionRevalidator<S: IdentityStore + ?Sized> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: IdentityStore + ?Sized> Clone for SessionRevalidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: IdentityStore + ?Sized + 'static> SessionRevalidator<S> {
    /// Create a revalidator using the configured session timeout.
    pub fn new(store: Arc<S>, config: &AuthConfig) -> Self {
        Self {
            store,
            timeout: config.session_timeout(),
        }
    }

    /// Session timeout in effect.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Serialization hook: the session stores the identity's ID and nothing else.
    pub fn serialize(&self, identity: &Identity) -> IdentityId {
        identity.id
    }

    /// Deserialization hook: resolve a session ID to an identity, or `None`.
    pub async fn deserialize(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        self.deserialize_at(id, Utc::now()).await
    }

    /// [`Self::deserialize`] against an explicit clock.
    pub async fn deserialize_at(
        &self,
        id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self.revalidate_at(id, now).await?.into_identity())
    }

    /// Run the revalidation sequence for one request.
    ///
    /// 1. look the identity up
    /// 2. missing → anonymous
    /// 3. idle past the timeout → anonymous
    /// 4. otherwise write `last_request_at = now` and wait for it
    ///
    /// The refresh runs on its own task so it completes even if the request
    /// is dropped mid-flight.
    pub async fn revalidate_at(
        &self,
        id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<SessionUser, StoreError> {
        let found = self.store.find_by_id(id).await.map_err(|e| {
            warn!(identity_id = id, error = %e, "Session lookup failed");
            e
        })?;

        let Some(mut identity) = found else {
            debug!(identity_id = id, "Session identity not found");
            return Ok(SessionUser::Anonymous(AnonymousReason::NotFound));
        };

        if is_stale(identity.last_request_at, now, self.timeout) {
            debug!(
                identity_id = id,
                last_request_at = ?identity.last_request_at,
                "Session expired"
            );
            return Ok(SessionUser::Anonymous(AnonymousReason::Expired));
        }

        let store = Arc::clone(&self.store);
        let update = IdentityUpdate::new().last_request_at(now);
        let refreshed = tokio::spawn(async move { store.update_by_id(id, &update).await })
            .await
            .map_err(|e| StoreError::Interrupted(e.to_string()))?
            .map_err(|e| {
                warn!(identity_id = id, error = %e, "Session refresh failed");
                e
            })?;

        if !refreshed {
            debug!(identity_id = id, "Session identity vanished before refresh");
            return Ok(SessionUser::Anonymous(AnonymousReason::Vanished));
        }

        identity.last_request_at = Some(now);
        Ok(SessionUser::Authenticated(identity))
    }
}
