//! Common types exchanged with the store.

use std::fmt;

use bytes::Bytes;
use zeroize::Zeroizing;

/// A key-value pair as observed in the store.
///
/// Revisions follow etcd's model: `create_revision` is the store revision at
/// which the key was created, `mod_revision` the revision of its last write,
/// and `version` the number of writes since creation.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use etcd_provider_store::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("config/flag"), Bytes::from("on"));
/// assert_eq!(kv.version, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,

    /// Store revision at which the key was created.
    pub create_revision: i64,

    /// Store revision of the last write to the key.
    pub mod_revision: i64,

    /// Number of writes to the key since it was created.
    pub version: i64,
}

impl KeyValue {
    /// Creates a key-value pair with zeroed revision metadata.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value, create_revision: 0, mod_revision: 0, version: 0 }
    }
}

/// A store-native user credential.
///
/// The password is wiped from memory when the credential is dropped and is
/// never printed by [`Debug`].
#[derive(Clone)]
pub struct Credential {
    username: String,
    password: Zeroizing<String>,
}

impl Credential {
    /// Creates a credential from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: Zeroizing::new(password.into()) }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_password() {
        let credential = Credential::new("root", "correct-horse-battery");
        let rendered = format!("{credential:?}");

        assert!(rendered.contains("root"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("correct-horse-battery"));
    }

    #[test]
    fn test_credential_accessors() {
        let credential = Credential::new("app", "s3cret-value");
        assert_eq!(credential.username(), "app");
        assert_eq!(credential.password(), "s3cret-value");
    }
}
