//! Single-flight refresh coordination.
//!
//! At most one refresh request may be in flight per session. Every caller
//! that observes a 401 while one is outstanding must await the same outcome
//! instead of starting its own refresh.
//!
//! The slot is guarded by a synchronous mutex and populated before the
//! refresh future first yields, so two tasks racing between "is a refresh
//! running?" and "start one" cannot both win: whoever takes the lock second
//! finds the shared handle already installed and just clones it.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use thiserror::Error;

/// Terminal refresh failure, shared by every awaiting caller.
///
/// `Clone` because a [`Shared`] future hands the same result to all of its
/// clones; the interesting detail (the session is gone) is the same for
/// everyone, so a message string is all this carries.
#[derive(Debug, Clone, Error)]
#[error("session refresh failed: {reason}")]
pub(crate) struct RefreshFailure {
    reason: Arc<str>,
}

impl RefreshFailure {
    pub(crate) fn new(reason: impl AsRef<str>) -> Self {
        Self {
            reason: Arc::from(reason.as_ref()),
        }
    }
}

pub(crate) type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshFailure>>>;

/// The process-wide "refresh in flight" singleton.
#[derive(Default)]
pub(crate) struct RefreshSlot {
    current: Mutex<Option<SharedRefresh>>,
}

impl RefreshSlot {
    /// Join the in-flight refresh, or install the one built by `start`.
    ///
    /// The lock is held only across the check-and-install; `start` runs
    /// synchronously and must not await.
    pub(crate) fn join_or_start(
        &self,
        start: impl FnOnce() -> SharedRefresh,
    ) -> (SharedRefresh, bool) {
        let mut slot = self.current.lock();
        if let Some(in_flight) = slot.as_ref() {
            return (in_flight.clone(), false);
        }
        let started = start();
        *slot = Some(started.clone());
        (started, true)
    }

    /// Drop the settled refresh so the next 401 starts a fresh one.
    pub(crate) fn clear(&self) {
        self.current.lock().take();
    }

    #[cfg(test)]
    pub(crate) fn is_in_flight(&self) -> bool {
        self.current.lock().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ready_refresh(result: Result<(), RefreshFailure>) -> SharedRefresh {
        async move { result }.boxed().shared()
    }

    #[tokio::test]
    async fn test_second_caller_joins_first_refresh() {
        let slot = RefreshSlot::default();

        let (first, started_first) = slot.join_or_start(|| ready_refresh(Ok(())));
        let (second, started_second) =
            slot.join_or_start(|| panic!("second caller must not start a refresh"));

        assert!(started_first);
        assert!(!started_second);
        assert!(first.await.is_ok());
        assert!(second.await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_allows_a_new_refresh() {
        let slot = RefreshSlot::default();

        let (first, _) = slot.join_or_start(|| ready_refresh(Err(RefreshFailure::new("expired"))));
        assert!(first.await.is_err());
        assert!(slot.is_in_flight());

        slot.clear();
        assert!(!slot.is_in_flight());

        let (second, started) = slot.join_or_start(|| ready_refresh(Ok(())));
        assert!(started);
        assert!(second.await.is_ok());
    }
}
