//! User account reconciliation.
//!
//! Users have no read or update path: an account is created once and
//! destroyed when its declaration changes or goes away.

use std::{fmt, sync::Arc};

use etcd_provider_store::{Credential, StoreClient};
use zeroize::Zeroizing;

use crate::{
    context::OperationContext,
    error::{Operation, ReconcileError, ReconcileResult, ResourceKind},
    outcome::DeleteOutcome,
    policy,
    schema::{ResourceSchema, USER_SCHEMA},
};

/// Declared configuration of a user account.
///
/// The password is wiped from memory on drop and never printed by [`Debug`].
#[derive(Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// Name of the user.
    pub username: String,
    /// Password of the user.
    pub password: Zeroizing<String>,
}

impl UserConfig {
    /// Creates a configuration.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: Zeroizing::new(password.into()) }
    }
}

impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// State of a created user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    /// Resource identity: the username.
    pub id: String,
    /// Name of the user.
    pub username: String,
}

/// Reconciles user accounts against a shared store.
pub struct UserReconciler<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for UserReconciler<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: ?Sized> fmt::Debug for UserReconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserReconciler").finish_non_exhaustive()
    }
}

impl<S: StoreClient + ?Sized> UserReconciler<S> {
    /// Creates a reconciler over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The declared schema of user accounts.
    #[must_use]
    pub fn schema(&self) -> &'static ResourceSchema {
        &USER_SCHEMA
    }

    /// Checks a configuration without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidInput`] for an empty username or a
    /// password shorter than [`MIN_PASSWORD_LENGTH`](policy::MIN_PASSWORD_LENGTH).
    pub fn validate(&self, config: &UserConfig) -> ReconcileResult<()> {
        policy::validate_username(&config.username)?;
        policy::validate_password(&config.password)
    }

    /// Registers the user.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput`](ReconcileError::InvalidInput) if [`validate`](Self::validate) fails;
    ///   the store is never called
    /// - [`TransactionConflict`](ReconcileError::TransactionConflict) if the name is taken
    /// - [`ClientCancelled`](ReconcileError::ClientCancelled) /
    ///   [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) if `ctx` fires first
    /// - [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) on cluster failures
    #[tracing::instrument(
        name = "user_create",
        skip(self, ctx, config),
        fields(username = %config.username)
    )]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        config: &UserConfig,
    ) -> ReconcileResult<UserState> {
        self.validate(config)?;

        let credential = Credential::new(config.username.as_str(), config.password.as_str());
        ctx.run(Operation::Create, async {
            self.store.create_user(&credential).await.map_err(|err| {
                ReconcileError::from_store(
                    err,
                    Operation::Create,
                    ResourceKind::User,
                    &config.username,
                )
            })
        })
        .await
        .inspect_err(|err| err.log_failure("user create"))?;

        tracing::debug!("user created");
        Ok(UserState { id: config.username.clone(), username: config.username.clone() })
    }

    /// Removes the user. Removing an absent user succeeds.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput`](ReconcileError::InvalidInput) for an empty username
    /// - [`ClientCancelled`](ReconcileError::ClientCancelled) /
    ///   [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) if `ctx` fires first
    /// - [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) on cluster failures
    #[tracing::instrument(name = "user_delete", skip(self, ctx))]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        username: &str,
    ) -> ReconcileResult<DeleteOutcome> {
        policy::validate_username(username)?;

        let result = ctx
            .run(Operation::Delete, async {
                self.store.delete_user(username).await.map_err(|err| {
                    ReconcileError::from_store(err, Operation::Delete, ResourceKind::User, username)
                })
            })
            .await;

        match result {
            Ok(()) => {
                tracing::debug!("user deleted");
                Ok(DeleteOutcome::Deleted)
            },
            Err(ReconcileError::NotFound { .. }) => {
                tracing::info!("user already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            },
            Err(err) => {
                err.log_failure("user delete");
                Err(err)
            },
        }
    }
}
