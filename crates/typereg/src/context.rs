//! Cooperative cancellation and deadlines for registry calls.
//!
//! Every instance operation takes a [`Context`]. The registry checks it
//! before touching a store and before invoking a loader; loaders receive the
//! same context and are expected to honor it. Nothing in the core spawns
//! work, so a loader always runs on the calling thread.

use crate::error::{RegistryError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shareable cancellation flag.
///
/// Clones share state: cancelling any clone is observed by all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Call context: a cancellation token plus an optional deadline.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use typereg::Context;
///
/// let ctx = Context::with_timeout(Duration::from_secs(1));
/// assert!(ctx.check().is_ok());
///
/// ctx.token().cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// A context driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|(at, _)| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some((at, _)) if Instant::now() >= at)
    }

    /// Return an error if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => Err(RegistryError::Timeout(timeout)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fails() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_expired());
    }

    #[test]
    fn test_clone_shares_cancellation() {
        let ctx = Context::background();
        let other = ctx.clone();
        other.token().cancel();
        assert!(matches!(ctx.check(), Err(RegistryError::Cancelled)));
    }

    #[test]
    fn test_zero_timeout_expires() {
        let ctx = Context::with_timeout(Duration::ZERO);
        assert!(ctx.is_expired());
        assert!(matches!(ctx.check(), Err(RegistryError::Timeout(_))));
    }

    #[test]
    fn test_with_token() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());
        assert!(ctx.check().is_ok());
        token.cancel();
        assert!(ctx.check().is_err());
    }
}
