//! Waiting for topology to reach an intended shape
//!
//! Group mutations send commands to devices and then have to wait until the
//! coordinators report the result back through topology events. The waiter
//! behaves like a condition variable over [`TopologyLock`]: the lock is
//! released while parked, so the event path can apply topology updates, and
//! re-acquired before each predicate check.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::GroupViewCache;
use crate::model::SpeakerId;
use crate::topology::TopologyStore;

/// Guard proving the holder is the only one mutating topology
pub type TopologyGuard = OwnedMutexGuard<()>;

/// The single mutual exclusion domain for group mutations and topology writes
#[derive(Clone, Default)]
pub struct TopologyLock(Arc<Mutex<()>>);

impl TopologyLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> TopologyGuard {
        Arc::clone(&self.0).lock_owned().await
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Converged,
    TimedOut,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }
}

/// Blocks until live topology matches a set of target groups
pub struct ConvergenceWaiter {
    topology: Arc<TopologyStore>,
    group_views: Arc<GroupViewCache>,
}

impl ConvergenceWaiter {
    pub fn new(topology: Arc<TopologyStore>, group_views: Arc<GroupViewCache>) -> Self {
        Self {
            topology,
            group_views,
        }
    }

    /// Whether every target group, coordinator first, is live
    pub fn converged(&self, targets: &[Vec<SpeakerId>]) -> bool {
        targets.iter().all(|group| self.topology.matches(group))
    }

    /// Wait until every group in `targets` is live or `timeout` elapses
    ///
    /// `guard` is released while waiting and handed back re-acquired. Cached
    /// group views are invalidated however the wait ends.
    pub async fn wait_for(
        &self,
        guard: TopologyGuard,
        targets: &[Vec<SpeakerId>],
        timeout: Duration,
    ) -> (TopologyGuard, Convergence) {
        let lock = Arc::clone(OwnedMutexGuard::mutex(&guard));
        let deadline = Instant::now() + timeout;
        let mut changes = self.topology.subscribe();
        let mut guard = guard;

        let outcome = loop {
            changes.borrow_and_update();
            if self.converged(targets) {
                break Convergence::Converged;
            }

            drop(guard);
            let woke = tokio::time::timeout_at(deadline, changes.changed()).await;
            guard = Arc::clone(&lock).lock_owned().await;

            match woke {
                Ok(Ok(())) => continue,
                // Store dropped or deadline passed: one last look under the lock
                Ok(Err(_)) | Err(_) => {
                    if self.converged(targets) {
                        break Convergence::Converged;
                    }
                    break Convergence::TimedOut;
                }
            }
        };

        match outcome {
            Convergence::Converged => debug!("Topology converged to {:?}", targets),
            Convergence::TimedOut => warn!(
                "Timeout waiting for target groups {:?} after {:?}",
                targets, timeout
            ),
        }
        self.group_views.invalidate_all();

        (guard, outcome)
    }
}
