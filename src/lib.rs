//! Warden - identity and session authentication core
//!
//! Password credential storage and verification, per-request session
//! revalidation, and admin/superuser authorization decisions.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use auth::{
    authenticate, check_password_policy, generate_confirmation_key, generate_salt, hash_password,
    set_password, AnonymousReason, LoginError, PasswordChange, PasswordError, PolicyViolation,
    SessionRevalidator, SessionUser,
};
pub use config::{AuthConfig, Config};
pub use db::{
    Database, DomainContext, Identity, IdentityId, IdentityRepository, IdentityStore,
    IdentityUpdate, NewIdentity, PublicIdentity, StoreError,
};
pub use error::{Result, WardenError};
