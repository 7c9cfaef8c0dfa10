//! Local validation of declared attributes.
//!
//! Everything here runs before a reconciler touches the network, so a bad
//! declaration never costs a round trip.

use crate::error::{ReconcileError, ReconcileResult};

/// Minimum number of characters (Unicode scalar values) in a user password.
pub const MIN_PASSWORD_LENGTH: usize = 10;

/// Rejects an empty key.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] on the `key` attribute.
pub fn validate_key(key: &[u8]) -> ReconcileResult<()> {
    if key.is_empty() {
        return Err(ReconcileError::invalid_input("key", "key cannot be empty"));
    }
    Ok(())
}

/// Rejects an empty username.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] on the `username` attribute.
pub fn validate_username(username: &str) -> ReconcileResult<()> {
    if username.is_empty() {
        return Err(ReconcileError::invalid_input("username", "username cannot be empty"));
    }
    Ok(())
}

/// Rejects passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] on the `password` attribute. The
/// message never contains the password.
pub fn validate_password(password: &str) -> ReconcileResult<()> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ReconcileError::invalid_input(
            "password",
            format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters long, got {length}"
            ),
        ));
    }
    Ok(())
}
