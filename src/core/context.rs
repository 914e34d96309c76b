//! Cancellation and deadline propagation for admitted requests.
//!
//! A [`RequestContext`] pairs a [`CancellationToken`] with an optional
//! deadline. Derived contexts only ever tighten their parent: a child is
//! cancelled whenever its parent is, and its deadline is never later than the
//! parent's.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::GateError;

/// Deadline and cancellation scope for one unit of work.
#[derive(Debug, Clone)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    background: bool,
}

impl RequestContext {
    /// The trivial, always-open context.
    ///
    /// A gatekeeper treats a request carrying this context as if it carried
    /// none and derives the request scope from its own root instead.
    #[must_use]
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            background: true,
        }
    }

    /// A fresh cancellable context with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            background: false,
        }
    }

    /// Derive a cancellable child context.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            background: false,
        }
    }

    /// Derive a child whose deadline is at most `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, requested) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self {
            token: self.token.child_token(),
            deadline,
            background: false,
        }
    }

    /// Derive a child with an absolute deadline, clamped to the parent's.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self.deadline.map_or(deadline, |parent| parent.min(deadline));
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            background: false,
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this is the trivial background context.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        self.background
    }

    /// The deadline, if one applies.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has been cancelled or its deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// The reason the context ended, or `None` while it is still open.
    ///
    /// Cancellation wins over an expired deadline when both apply.
    #[must_use]
    pub fn error(&self) -> Option<GateError> {
        if self.token.is_cancelled() {
            return Some(GateError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(GateError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> GateError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => GateError::Cancelled,
                    () = tokio::time::sleep_until(deadline) => {
                        self.error().unwrap_or(GateError::DeadlineExceeded)
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                GateError::Cancelled
            }
        }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
