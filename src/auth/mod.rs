//! Authentication module for Warden.
//!
//! This module provides the credential engine (salts, hashing, password
//! policy, confirmation keys), session revalidation, and the account flows
//! built on them.

pub mod account;
mod confirmation;
mod password;
mod policy;
mod session;

pub use account::{change_password, lock, login, unlock, LoginError, PasswordChange};
pub use confirmation::{
    clear_confirmation_key, generate_confirmation_key, verify_confirmation_key, ConfirmationKey,
    CONFIRMATION_KEY_LENGTH, CONFIRMATION_KEY_TTL_MINUTES,
};
pub use password::{
    authenticate, derive_credentials, generate_salt, hash_password, set_password, PasswordError,
};
pub use policy::{check_password_policy, PolicyViolation, MIN_PASSWORD_LENGTH};
pub use session::{is_stale, AnonymousReason, SessionRevalidator, SessionUser};
