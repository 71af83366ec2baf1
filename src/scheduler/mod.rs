//! One-shot timer scheduling.
//!
//! The synchronizer never sleeps or blocks; all of its timing (the deferred
//! initial-fallback check and the polling ticks) goes through the
//! [`Scheduler`] trait so it can run against real time in production and a
//! virtual clock in tests.
//!
//! Two implementations:
//! - [`ThreadScheduler`]: a worker thread driven by a command channel,
//!   firing timers at real wall-clock deadlines.
//! - [`ManualScheduler`]: a virtual clock advanced explicitly, firing due
//!   timers deterministically in deadline order.

mod manual;
mod thread;

pub use manual::ManualScheduler;
pub use thread::ThreadScheduler;

use std::fmt;
use std::time::Duration;

/// Unique identifier for a scheduled timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// A deferred task. Runs at most once.
pub type Task = Box<dyn FnOnce() + Send>;

/// One-shot timer service.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run once after `delay`. Fire-and-forget: the call
    /// never blocks and never runs the task inline.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending timer. No-op if it already fired or was cancelled.
    fn cancel(&self, id: TimerId);

    /// Number of timers currently pending.
    fn pending(&self) -> usize;
}
