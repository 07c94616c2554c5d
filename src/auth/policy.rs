//! Password policy for Warden.
//!
//! A policy failure is an expected outcome the caller branches on, so it is
//! returned as a value and never logged as an error.

use thiserror::Error;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Reason a password was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Password is shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,

    /// Confirmation was given and differs from the password.
    #[error("password confirmation does not match")]
    ConfirmationMismatch,

    /// Missing the uppercase, lowercase, digit sequence.
    #[error("password must contain an uppercase letter, then a lowercase letter, then a digit")]
    RequirementsNotMet,
}

impl PolicyViolation {
    /// Stable reason code for callers and clients.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyViolation::TooShort => "too_short",
            PolicyViolation::ConfirmationMismatch => "confirmation_mismatch",
            PolicyViolation::RequirementsNotMet => "requirements_not_met",
        }
    }
}

/// True if the password has an ASCII uppercase letter, followed somewhere later
/// by an ASCII lowercase letter, followed somewhere later by a digit.
fn has_ordered_classes(password: &str) -> bool {
    let checks: [fn(&char) -> bool; 3] = [
        char::is_ascii_uppercase,
        char::is_ascii_lowercase,
        char::is_ascii_digit,
    ];

    let mut stage = 0;
    for c in password.chars() {
        if checks[stage](&c) {
            stage += 1;
            if stage == checks.len() {
                return true;
            }
        }
    }
    false
}

/// Check a candidate password.
///
/// Checks run in order and the first failure wins:
/// 1. length of at least [`MIN_PASSWORD_LENGTH`] characters
/// 2. confirmation, if given, matches
/// 3. uppercase, lowercase and digit appear in that relative order
///
/// # Examples
///
/// ```
/// use warden::auth::{check_password_policy, PolicyViolation};
///
/// assert_eq!(check_password_policy("abc", None), Err(PolicyViolation::TooShort));
/// assert!(check_password_policy("Abcdef1", None).is_ok());
/// ```
pub fn check_password_policy(
    password: &str,
    confirmation: Option<&str>,
) -> Result<(), PolicyViolation> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PolicyViolation::TooShort);
    }
    if let Some(confirmation) = confirmation {
        if confirmation != password {
            return Err(PolicyViolation::ConfirmationMismatch);
        }
    }
    if !has_ordered_classes(password) {
        return Err(PolicyViolation::RequirementsNotMet);
    }
    Ok(())
}
