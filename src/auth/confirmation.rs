//! Confirmation keys for email confirmation and password reset links.

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::db::{Identity, IdentityUpdate};

/// Length of generated confirmation keys.
pub const CONFIRMATION_KEY_LENGTH: usize = 32;

/// How long a confirmation key stays valid, in minutes.
pub const CONFIRMATION_KEY_TTL_MINUTES: i64 = 30;

/// A freshly issued confirmation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationKey {
    /// Opaque key to deliver to the identity owner.
    pub key: String,
    /// When the key stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl ConfirmationKey {
    /// Store update persisting this key for the given identity.
    pub fn to_update(&self, identity: &Identity) -> IdentityUpdate {
        IdentityUpdate::new().confirmation(
            Some(self.key.clone()),
            Some(self.expires_at),
            identity.confirmation_tries,
        )
    }
}

fn random_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Issue a new confirmation key on an in-memory identity.
///
/// Replaces any outstanding key, sets the expiry 30 minutes past `now`, and
/// increments the tries counter.
pub fn generate_confirmation_key(identity: &mut Identity, now: DateTime<Utc>) -> ConfirmationKey {
    let issued = ConfirmationKey {
        key: random_key(),
        expires_at: now + Duration::minutes(CONFIRMATION_KEY_TTL_MINUTES),
    };

    identity.confirmation_key = Some(issued.key.clone());
    identity.confirmation_key_expires_at = Some(issued.expires_at);
    identity.confirmation_tries += 1;

    issued
}

/// Check a presented key against the identity's outstanding one.
pub fn verify_confirmation_key(identity: &Identity, key: &str, now: DateTime<Utc>) -> bool {
    let (Some(expected), Some(expires_at)) = (
        identity.confirmation_key.as_deref(),
        identity.confirmation_key_expires_at,
    ) else {
        return false;
    };

    if now >= expires_at || expected.len() != key.len() {
        return false;
    }

    expected
        .bytes()
        .zip(key.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Clear the outstanding key and reset the tries counter.
pub fn clear_confirmation_key(identity: &mut Identity) -> IdentityUpdate {
    identity.confirmation_key = None;
    identity.confirmation_key_expires_at = None;
    identity.confirmation_tries = 0;
    IdentityUpdate::new().confirmation(None, None, 0)
}
