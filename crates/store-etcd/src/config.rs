//! Configuration for the etcd store.
//!
//! This module provides [`EtcdStoreConfig`], which describes how to reach the
//! cluster (endpoints, credentials) and how long to wait on it.

use std::{fmt, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

use crate::error::{EtcdStoreError, Result};

/// Default connection (dial) timeout (5 seconds).
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`EtcdStore`](crate::EtcdStore).
///
/// # Authentication
///
/// `username` and `password` must be given together or not at all. The
/// password is zeroized on drop, never serialized and never printed by
/// [`Debug`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use etcd_provider_store_etcd::EtcdStoreConfig;
///
/// let config = EtcdStoreConfig::builder()
///     .endpoints(["http://127.0.0.1:2379"])
///     .username("root")
///     .password("root-password")
///     .request_timeout(Duration::from_secs(10))
///     .build()?;
///
/// assert_eq!(config.endpoints(), &["http://127.0.0.1:2379"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtcdStoreConfig {
    /// Cluster endpoint URLs.
    pub(crate) endpoints: Vec<String>,

    /// User to authenticate as.
    #[serde(default)]
    pub(crate) username: Option<String>,

    /// Password for `username`.
    #[serde(default, skip_serializing, deserialize_with = "deserialize_password")]
    pub(crate) password: Option<Zeroizing<String>>,

    /// Connection (dial) timeout.
    #[serde(with = "humantime_serde", default = "default_dial_timeout")]
    pub(crate) dial_timeout: Duration,

    /// Per-request timeout.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub(crate) request_timeout: Duration,

    /// HTTP/2 keep-alive ping interval; keep-alive is off when unset.
    #[serde(with = "humantime_serde", default)]
    pub(crate) keep_alive_interval: Option<Duration>,
}

fn default_dial_timeout() -> Duration {
    DEFAULT_DIAL_TIMEOUT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn deserialize_password<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Zeroizing<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(Zeroizing::new))
}

#[bon::bon]
impl EtcdStoreConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `username` / `password` - Credentials; both or neither.
    /// * `dial_timeout` - Connection timeout (default: 5 seconds).
    /// * `request_timeout` - Per-request timeout (default: 30 seconds).
    /// * `keep_alive_interval` - HTTP/2 keep-alive ping interval (default: off).
    ///
    /// # Errors
    ///
    /// Returns [`EtcdStoreError::Config`] if:
    /// - No endpoints are given, or an endpoint is blank
    /// - Only one of `username` / `password` is given
    /// - A timeout is zero
    #[builder]
    pub fn new(
        #[builder(with = |iter: impl IntoIterator<Item = impl Into<String>>| {
            iter.into_iter().map(Into::into).collect()
        })]
        endpoints: Vec<String>,
        #[builder(into)] username: Option<String>,
        #[builder(with = |password: impl Into<String>| Zeroizing::new(password.into()))]
        password: Option<Zeroizing<String>>,
        #[builder(default = DEFAULT_DIAL_TIMEOUT)] dial_timeout: Duration,
        #[builder(default = DEFAULT_REQUEST_TIMEOUT)] request_timeout: Duration,
        keep_alive_interval: Option<Duration>,
    ) -> Result<Self> {
        let config = Self {
            endpoints,
            username,
            password,
            dial_timeout,
            request_timeout,
            keep_alive_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants [`new`](Self::new) enforces.
    ///
    /// Call this after deserializing a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EtcdStoreError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(EtcdStoreError::Config("at least one endpoint is required".into()));
        }

        if self.endpoints.iter().any(|e| e.trim().is_empty()) {
            return Err(EtcdStoreError::Config("endpoints cannot be blank".into()));
        }

        match (&self.username, &self.password) {
            (Some(_), None) => {
                return Err(EtcdStoreError::Config("username given without password".into()));
            },
            (None, Some(_)) => {
                return Err(EtcdStoreError::Config("password given without username".into()));
            },
            _ => {},
        }

        if self.dial_timeout.is_zero() {
            return Err(EtcdStoreError::Config("dial_timeout must be greater than zero".into()));
        }

        if self.request_timeout.is_zero() {
            return Err(EtcdStoreError::Config("request_timeout must be greater than zero".into()));
        }

        Ok(())
    }

    /// Returns the configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Returns the username, if authentication is configured.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the keep-alive interval, if enabled.
    #[must_use]
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        self.keep_alive_interval
    }

    /// Builds the `etcd-client` connect options from this config.
    pub(crate) fn connect_options(&self) -> etcd_client::ConnectOptions {
        let mut options = etcd_client::ConnectOptions::new()
            .with_connect_timeout(self.dial_timeout)
            .with_timeout(self.request_timeout);

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options = options.with_user(username.clone(), password.as_str());
        }

        if let Some(interval) = self.keep_alive_interval {
            options = options.with_keep_alive(interval, self.request_timeout);
        }

        options
    }
}

impl fmt::Debug for EtcdStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtcdStoreConfig")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("dial_timeout", &self.dial_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .finish()
    }
}
