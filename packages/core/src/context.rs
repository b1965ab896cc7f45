//! Cancellation signal passed into batch operations.
//!
//! The core never measures time on its own behalf: it only asks a
//! [`BatchContext`] whether the batch should stop. Timeouts are expressed as
//! a deadline carried by the context, chosen by the caller.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{CancelCause, Result, StoreError};

/// Caller-supplied cancellation token plus an optional deadline.
///
/// Cloning is cheap and clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl BatchContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Wraps an existing token with no deadline.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A fresh context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// A fresh context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derives a context cancelled by this one and expiring after `timeout`.
    ///
    /// The earlier of the parent deadline and the new one wins. Cancelling
    /// the child does not cancel the parent.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, child) => parent.or(child),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Fires the token. Batches observe it at their next check.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if [`check`](Self::check) would fail.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Reports whether the batch may continue.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cancelled`] if the token fired or the deadline
    /// has passed. An explicit cancellation is reported before an expired
    /// deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(StoreError::Cancelled(CancelCause::Cancelled));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(StoreError::Cancelled(CancelCause::DeadlineExceeded))
            }
            _ => Ok(()),
        }
    }
}
