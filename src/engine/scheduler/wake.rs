//! Wait/wake strategies for the event loop.
//!
//! A strategy decides how the platform thread blocks between two cycles and how a post from
//! another thread interrupts that block. The event loop only needs two capabilities from it:
//! [`WakeStrategy::wait_until`] and [`WakeStrategy::wake`].
//!
//! - [`CondvarWake`]: blocks on a condition variable tied to the queue lock. Suited for hosts
//!   that have no event source of their own (headless).
//! - [`HostWake`]: never blocks. The host's native run loop does the waiting, and a post only
//!   nudges it through a notifier supplied by the host.

use super::queue::QueueGuard;
use parking_lot::Condvar;
use std::fmt;
use std::time::Instant;

/// Why a call to [`WakeStrategy::wait_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Something signaled the strategy. May be spurious.
    Signaled,
    /// The deadline was reached (or the underlying timer says so).
    TimedOut,
    /// The strategy does not block; control goes back to the host right away.
    Deferred,
}

pub trait WakeStrategy: Send + Sync {
    /// Blocks until `deadline` (`None` waits without a time limit) or until [`wake`](Self::wake)
    /// is called.
    ///
    /// `guard` holds the queue lock on entry and must hold it again on return. Blocking
    /// strategies release it for the duration of the wait.
    fn wait_until<T>(&self, guard: &mut QueueGuard<'_, T>, deadline: Option<Instant>) -> Wakeup;

    /// Interrupts a pending or upcoming wait. Called after every post, without the queue lock.
    fn wake(&self);
}

/// Condition-variable strategy for headless hosts.
#[derive(Debug, Default)]
pub struct CondvarWake {
    condvar: Condvar,
}

impl CondvarWake {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WakeStrategy for CondvarWake {
    fn wait_until<T>(&self, guard: &mut QueueGuard<'_, T>, deadline: Option<Instant>) -> Wakeup {
        match deadline {
            Some(deadline) => {
                if self.condvar.wait_until(guard, deadline).timed_out() {
                    Wakeup::TimedOut
                } else {
                    Wakeup::Signaled
                }
            }
            None => {
                self.condvar.wait(guard);
                Wakeup::Signaled
            }
        }
    }

    fn wake(&self) {
        // Only the platform thread ever waits
        self.condvar.notify_one();
    }
}

/// Strategy for hosts pumping their own native run loop.
///
/// Waiting is left to the host. A post calls the notifier so the host can schedule its next
/// poll (post a message to its run loop, signal an eventfd, ...).
pub struct HostWake {
    notify: Box<dyn Fn() + Send + Sync>,
}

impl HostWake {
    pub fn new(notify: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            notify: Box::new(notify),
        }
    }
}

impl fmt::Debug for HostWake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostWake").finish_non_exhaustive()
    }
}

impl WakeStrategy for HostWake {
    fn wait_until<T>(&self, _guard: &mut QueueGuard<'_, T>, _deadline: Option<Instant>) -> Wakeup {
        Wakeup::Deferred
    }

    fn wake(&self) {
        (self.notify)();
    }
}
