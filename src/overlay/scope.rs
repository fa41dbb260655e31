//! One-shot cancellation scopes with owner acknowledgement
//!
//! Every display request mints a fresh pair: the [`CancelScope`] stays in the
//! session so the next request can cancel it, and the [`ScopeGuard`] travels
//! with the task that owns the surface. Dropping the guard is the ack.

use tokio_util::sync::CancellationToken;

/// Issuer side of a scope: cancel it, then wait for the owner to let go.
#[derive(Debug, Clone)]
pub struct CancelScope {
    cancel: CancellationToken,
    finished: CancellationToken,
}

/// Owner side of a scope. Acknowledges cancellation when dropped.
#[derive(Debug)]
pub struct ScopeGuard {
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl CancelScope {
    /// Mint a fresh scope and the guard for its owner.
    pub fn new() -> (Self, ScopeGuard) {
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let guard = ScopeGuard {
            cancel: cancel.clone(),
            finished: finished.clone(),
        };
        (Self { cancel, finished }, guard)
    }

    /// A scope with no owner: already cancelled and already acknowledged.
    pub fn settled() -> Self {
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        cancel.cancel();
        finished.cancel();
        Self { cancel, finished }
    }

    /// Signal the owner to abort. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the owner has dropped its guard.
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Cancel the scope and block until its owner has exited.
    pub async fn cancel_and_wait(&self) {
        self.cancel.cancel();
        self.finished.cancelled().await;
    }
}

impl ScopeGuard {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once a newer request has cancelled this scope.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.finished.cancel();
    }
}
