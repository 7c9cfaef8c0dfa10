//! Per-operation cancellation and deadline.
//!
//! Every reconciler verb takes an [`OperationContext`]. The context is
//! consulted twice: once before the store call, so an already cancelled or
//! expired request never reaches the cluster, and once while the call is in
//! flight, when the store future is raced against both signals and dropped
//! as soon as one fires.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Operation, ReconcileError, ReconcileResult};

/// Cancellation token and optional deadline for one operation.
///
/// Cloning a context shares its token: cancelling any clone cancels them all.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use etcd_provider_reconcile::OperationContext;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
/// assert!(ctx.deadline().is_some());
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationContext {
    /// Creates a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new(), deadline: None }
    }

    /// Uses `token` as the cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the operation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ClientCancelled`] or
    /// [`ReconcileError::DeadlineExceeded`] for `operation`.
    pub fn check(&self, operation: Operation) -> ReconcileResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::ClientCancelled { operation });
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(ReconcileError::DeadlineExceeded { operation });
        }
        Ok(())
    }

    /// Runs `call` under this context.
    ///
    /// `call` is not polled at all if the context is already done. Otherwise
    /// cancellation wins over the deadline, and both win over a call that
    /// becomes ready in the same poll.
    ///
    /// # Errors
    ///
    /// Returns the error of `call`, or
    /// [`ReconcileError::ClientCancelled`] /
    /// [`ReconcileError::DeadlineExceeded`] if the context fires first.
    pub async fn run<T, F>(&self, operation: Operation, call: F) -> ReconcileResult<T>
    where
        F: Future<Output = ReconcileResult<T>>,
    {
        self.check(operation)?;

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!(%operation, "operation cancelled in flight");
                Err(ReconcileError::ClientCancelled { operation })
            }
            () = expired => {
                tracing::debug!(%operation, "operation deadline exceeded in flight");
                Err(ReconcileError::DeadlineExceeded { operation })
            }
            result = call => result,
        }
    }
}
