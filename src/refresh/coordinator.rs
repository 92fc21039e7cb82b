use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::errors::RefreshError;
use crate::session::Credential;

/// Outcome shared between the refresh leader and every queued waiter.
pub type RefreshResult = Result<Credential, RefreshError>;

struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshResult>>,
}

/// Guarantees at most one in-flight credential refresh per client.
///
/// Callers hitting a 401 `join()` the coordinator: the first becomes the
/// leader and must run the refresh, everyone arriving while it is in flight
/// becomes a waiter and shares the leader's outcome. Waiters settle in
/// strict arrival order.
///
/// The state lock is a plain `std::sync::Mutex` and is never held across an
/// await; claiming the slot and registering a waiter happen under the same
/// acquisition, so two callers can never both observe `refreshing == false`.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a caller got out of [`RefreshCoordinator::join`].
pub enum RefreshRole<'a> {
    /// This caller owns the refresh; it must settle via the guard.
    Leader(SettleGuard<'a>),
    /// A refresh is already in flight; await its outcome.
    Follower(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState {
                refreshing: false,
                waiters: Vec::new(),
            }),
        }
    }

    /// Claims the refresh slot or enqueues a waiter, atomically.
    pub fn join(&self) -> RefreshRole<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(waiters = state.waiters.len(), "refresh in flight; queued waiter");
            RefreshRole::Follower(RefreshWaiter { rx })
        } else {
            state.refreshing = true;
            RefreshRole::Leader(SettleGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Delivers `outcome` to every waiter in arrival order and reopens the
    /// slot. The queue is drained and the flag cleared under one lock
    /// acquisition so no new refresh can start while stale waiters remain.
    /// Returns how many waiters were notified.
    fn settle(&self, outcome: RefreshResult) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        let notified = waiters.len();
        debug!(waiters = notified, ok = outcome.is_ok(), "refresh settled");
        for tx in waiters {
            // A waiter that gave up waiting just drops its receiver.
            let _ = tx.send(outcome.clone());
        }
        notified
    }

    // A poisoned lock only means some thread panicked between field writes
    // that are each individually consistent; recover the inner state.
    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Leader-held proof that the refresh slot is claimed.
///
/// Settling consumes the guard. A guard dropped unsettled (panic, cancelled
/// future) settles with [`RefreshError::aborted`] so queued waiters are
/// failed rather than stranded.
pub struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    /// Settles the in-flight refresh; returns the number of waiters served.
    pub fn settle(mut self, outcome: RefreshResult) -> usize {
        self.settled = true;
        self.coordinator.settle(outcome)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh leader dropped without settling; failing queued waiters");
            self.coordinator.settle(Err(RefreshError::aborted()));
        }
    }
}

/// A queued caller awaiting the in-flight refresh's settlement.
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshResult>,
}

impl RefreshWaiter {
    pub async fn outcome(self) -> RefreshResult {
        match self.rx.await {
            Ok(result) => result,
            // Sender dropped unsent: the coordinator itself was torn down.
            Err(_) => Err(RefreshError::aborted()),
        }
    }
}
