//! Identity record for Warden.
//!
//! The identity is the persisted principal. Superuser and admin status are
//! never stored on it; they are derived on demand from the record and the
//! [`AuthConfig`] passed in by the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{self, PasswordError};
use crate::config::AuthConfig;

/// Identity primary key.
pub type IdentityId = i64;

/// Role assigned to new identities.
pub const DEFAULT_ROLE: i64 = 100;

/// Roles at or below this value are administrative. Lower is more privileged.
pub const ADMIN_ROLE_THRESHOLD: i64 = 5;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Identity input validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email is empty.
    #[error("email cannot be empty")]
    EmailEmpty,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,
}

/// Normalize an email for storage and lookup.
///
/// Trims surrounding whitespace and lowercases. The result must contain `@`.
///
/// # Examples
///
/// ```
/// use warden::db::normalize_email;
///
/// assert_eq!(normalize_email(" Henry@Example.COM ").unwrap(), "henry@example.com");
/// assert!(normalize_email("no-at-sign").is_err());
/// ```
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if !email.contains('@') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(email.to_lowercase())
}

/// A salt and the password hash derived from it.
///
/// The two are only ever written together.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Per-identity salt.
    pub salt: String,
    /// Hash of the password keyed by `salt`.
    pub hashed_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Something an identity may own, such as a domain or group.
pub trait DomainContext {
    /// ID of the owning identity, if any.
    fn owner_id(&self) -> Option<IdentityId>;
}

/// Identity entity representing one authenticated principal.
#[derive(Clone, sqlx::FromRow)]
pub struct Identity {
    /// Unique identity ID.
    pub id: IdentityId,
    /// Given name (optional).
    pub first_name: Option<String>,
    /// Family name (optional).
    pub last_name: Option<String>,
    /// Login email, unique and lowercase.
    pub email: String,
    /// Password salt.
    pub salt: String,
    /// Password hash keyed by `salt`.
    pub hashed_password: String,
    /// Privilege level. Lower is more privileged.
    pub role: i64,
    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Address of the last successful login.
    pub last_login_ip: Option<String>,
    /// Last revalidated request.
    pub last_request_at: Option<DateTime<Utc>>,
    /// When the identity was locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// Who locked the identity.
    pub locked_by: Option<IdentityId>,
    /// Outstanding confirmation key.
    pub confirmation_key: Option<String>,
    /// When the confirmation key stops being accepted.
    pub confirmation_key_expires_at: Option<DateTime<Utc>>,
    /// Number of confirmation keys issued since the last reset.
    pub confirmation_tries: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Plaintext of a password set on this instance. Never persisted.
    #[sqlx(skip)]
    pub password: Option<String>,
}

impl Identity {
    /// First and last name joined by a space, whichever is present, or the email.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::db::Identity;
    ///
    /// let mut identity = Identity::blank(1, "henry@example.com");
    /// assert_eq!(identity.full_name(), "henry@example.com");
    ///
    /// identity.first_name = Some("Henry".to_string());
    /// identity.last_name = Some("King".to_string());
    /// assert_eq!(identity.full_name(), "Henry King");
    /// ```
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.email.clone(),
        }
    }

    /// Check if the identity's email is on the superuser allow-list.
    ///
    /// Exact, case-sensitive match against the stored lowercase email.
    pub fn is_super_user(&self, config: &AuthConfig) -> bool {
        !config.superuser_emails.is_empty() && config.superuser_emails.contains(&self.email)
    }

    /// Check administrative rights, optionally within a domain.
    ///
    /// Superusers are always admins. With a context, ownership decides;
    /// without one, the role does.
    pub fn is_admin(&self, config: &AuthConfig, context: Option<&dyn DomainContext>) -> bool {
        if self.is_super_user(config) {
            return true;
        }
        match context {
            Some(domain) => domain.owner_id() == Some(self.id),
            None => self.role <= ADMIN_ROLE_THRESHOLD,
        }
    }

    /// Derived admin flag: superuser or administrative role.
    ///
    /// Never consults domain ownership, unlike [`Identity::is_admin`] with a
    /// context.
    pub fn admin(&self, config: &AuthConfig) -> bool {
        self.is_super_user(config) || self.role <= ADMIN_ROLE_THRESHOLD
    }

    /// Check if the identity is locked.
    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    /// Current salt and hash as a pair.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            salt: self.salt.clone(),
            hashed_password: self.hashed_password.clone(),
        }
    }

    /// Projection safe to hand to untrusted consumers.
    pub fn to_public(&self, config: &AuthConfig) -> PublicIdentity {
        PublicIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            email: self.email.clone(),
            last_login_at: self.last_login_at,
            last_request_at: self.last_request_at,
            superuser: self.is_super_user(config),
            admin: self.admin(config),
        }
    }

    /// In-memory identity with empty credentials and default role.
    ///
    /// Used for fixtures and store doubles; real identities come from
    /// [`NewIdentity::with_password`] through a store.
    pub fn blank(id: IdentityId, email: impl Into<String>) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: email.into(),
            salt: String::new(),
            hashed_password: String::new(),
            role: DEFAULT_ROLE,
            last_login_at: None,
            last_login_ip: None,
            last_request_at: None,
            locked_at: None,
            locked_by: None,
            confirmation_key: None,
            confirmation_key_expires_at: None,
            confirmation_tries: 0,
            created_at: String::new(),
            password: None,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("last_login_at", &self.last_login_at)
            .field("last_request_at", &self.last_request_at)
            .field("locked_at", &self.locked_at)
            .finish_non_exhaustive()
    }
}

/// Allow-listed view of an identity.
///
/// This is the only shape in which an identity leaves the crate toward an
/// untrusted consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Display name.
    pub full_name: String,
    /// Login email.
    pub email: String,
    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Last revalidated request.
    pub last_request_at: Option<DateTime<Utc>>,
    /// Superuser status at projection time.
    pub superuser: bool,
    /// Derived admin flag at projection time.
    pub admin: bool,
}

/// Data for creating a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    /// Normalized email.
    pub email: String,
    /// Salt and hash produced from the initial password.
    pub credentials: Credentials,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Role (defaults to [`DEFAULT_ROLE`]).
    pub role: i64,
}

/// Errors building a [`NewIdentity`].
#[derive(Error, Debug)]
pub enum NewIdentityError {
    /// The email was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The password could not be hashed.
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl NewIdentity {
    /// Create a new identity from an email and a plaintext password.
    ///
    /// The password is salted and hashed here; there is deliberately no way
    /// to supply a hash directly.
    pub fn with_password(email: &str, password: &str) -> Result<Self, NewIdentityError> {
        let email = normalize_email(email)?;
        let credentials = auth::derive_credentials(password)?;
        Ok(Self {
            email,
            credentials,
            first_name: None,
            last_name: None,
            role: DEFAULT_ROLE,
        })
    }

    /// Set the name parts.
    pub fn with_name(mut self, first: Option<&str>, last: Option<&str>) -> Self {
        self.first_name = first.map(str::to_string);
        self.last_name = last.map(str::to_string);
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: i64) -> Self {
        self.role = role;
        self
    }
}

/// Data for updating an existing identity.
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    /// New given name.
    pub first_name: Option<Option<String>>,
    /// New family name.
    pub last_name: Option<Option<String>>,
    /// New normalized email.
    pub email: Option<String>,
    /// New salt and hash.
    pub credentials: Option<Credentials>,
    /// New role.
    pub role: Option<i64>,
    /// New last login timestamp.
    pub last_login_at: Option<DateTime<Utc>>,
    /// New last login address.
    pub last_login_ip: Option<Option<String>>,
    /// New last request timestamp.
    pub last_request_at: Option<DateTime<Utc>>,
    /// New lock timestamp.
    pub locked_at: Option<Option<DateTime<Utc>>>,
    /// New locking identity.
    pub locked_by: Option<Option<IdentityId>>,
    /// New confirmation key.
    pub confirmation_key: Option<Option<String>>,
    /// New confirmation key expiry.
    pub confirmation_key_expires_at: Option<Option<DateTime<Utc>>>,
    /// New confirmation tries counter.
    pub confirmation_tries: Option<i64>,
}

impl IdentityUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new name parts.
    pub fn name(mut self, first: Option<String>, last: Option<String>) -> Self {
        self.first_name = Some(first);
        self.last_name = Some(last);
        self
    }

    /// Set new email, normalizing it.
    pub fn email(mut self, email: &str) -> Result<Self, ValidationError> {
        self.email = Some(normalize_email(email)?);
        Ok(self)
    }

    /// Set new credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set new role.
    pub fn role(mut self, role: i64) -> Self {
        self.role = Some(role);
        self
    }

    /// Record a login.
    pub fn last_login(mut self, at: DateTime<Utc>, ip: Option<String>) -> Self {
        self.last_login_at = Some(at);
        self.last_login_ip = Some(ip);
        self
    }

    /// Record request activity.
    pub fn last_request_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_request_at = Some(at);
        self
    }

    /// Lock the identity.
    pub fn lock(mut self, at: DateTime<Utc>, by: Option<IdentityId>) -> Self {
        self.locked_at = Some(Some(at));
        self.locked_by = Some(by);
        self
    }

    /// Clear the lock.
    pub fn unlock(mut self) -> Self {
        self.locked_at = Some(None);
        self.locked_by = Some(None);
        self
    }

    /// Set the confirmation key state.
    pub fn confirmation(
        mut self,
        key: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        tries: i64,
    ) -> Self {
        self.confirmation_key = Some(key);
        self.confirmation_key_expires_at = Some(expires_at);
        self.confirmation_tries = Some(tries);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.credentials.is_none()
            && self.role.is_none()
            && self.last_login_at.is_none()
            && self.last_login_ip.is_none()
            && self.last_request_at.is_none()
            && self.locked_at.is_none()
            && self.locked_by.is_none()
            && self.confirmation_key.is_none()
            && self.confirmation_key_expires_at.is_none()
            && self.confirmation_tries.is_none()
    }

    /// Apply the update to an in-memory identity.
    pub fn apply_to(&self, identity: &mut Identity) {
        if let Some(ref first) = self.first_name {
            identity.first_name = first.clone();
        }
        if let Some(ref last) = self.last_name {
            identity.last_name = last.clone();
        }
        if let Some(ref email) = self.email {
            identity.email = email.clone();
        }
        if let Some(ref credentials) = self.credentials {
            identity.salt = credentials.salt.clone();
            identity.hashed_password = credentials.hashed_password.clone();
        }
        if let Some(role) = self.role {
            identity.role = role;
        }
        if let Some(at) = self.last_login_at {
            identity.last_login_at = Some(at);
        }
        if let Some(ref ip) = self.last_login_ip {
            identity.last_login_ip = ip.clone();
        }
        if let Some(at) = self.last_request_at {
            identity.last_request_at = Some(at);
        }
        if let Some(at) = self.locked_at {
            identity.locked_at = at;
        }
        if let Some(by) = self.locked_by {
            identity.locked_by = by;
        }
        if let Some(ref key) = self.confirmation_key {
            identity.confirmation_key = key.clone();
        }
        if let Some(expires_at) = self.confirmation_key_expires_at {
            identity.confirmation_key_expires_at = expires_at;
        }
        if let Some(tries) = self.confirmation_tries {
            identity.confirmation_tries = tries;
        }
    }
}
