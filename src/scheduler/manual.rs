//! Virtual-clock scheduler for deterministic tests.

use super::{Scheduler, Task, TimerId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

struct Entry {
    id: TimerId,
    /// Virtual due time in milliseconds.
    due: u64,
    task: Task,
}

struct Inner {
    now: u64,
    timers: Vec<Entry>,
}

/// A scheduler driven by an explicit virtual clock.
///
/// Time only moves when [`ManualScheduler::advance`] is called. Due timers
/// fire in deadline order (schedule order on ties), with the clock set to
/// each timer's deadline while it runs, so a firing task observes the same
/// "now" it would under real time.
pub struct ManualScheduler {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                now: 0,
                timers: Vec::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current virtual time since construction.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.inner.lock().now)
    }

    /// Advance the virtual clock by `delta`, firing every timer that comes
    /// due along the way.
    pub fn advance(&self, delta: Duration) {
        let target = {
            let inner = self.inner.lock();
            inner.now + delta.as_millis() as u64
        };

        loop {
            // Pop the earliest due timer; run it outside the lock so it can
            // schedule or cancel timers itself.
            let entry = {
                let mut inner = self.inner.lock();
                let next = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.id.0))
                    .map(|(i, _)| i);
                match next {
                    Some(i) => {
                        let entry = inner.timers.remove(i);
                        inner.now = inner.now.max(entry.due);
                        entry
                    }
                    None => {
                        inner.now = target;
                        return;
                    }
                }
            };
            (entry.task)();
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut inner = self.inner.lock();
        let due = inner.now + delay.as_millis() as u64;
        inner.timers.push(Entry { id, due, task });
        id
    }

    fn cancel(&self, id: TimerId) {
        let mut inner = self.inner.lock();
        inner.timers.retain(|e| e.id != id);
    }

    fn pending(&self) -> usize {
        self.inner.lock().timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_fires_at_deadline_not_before() {
        let sched = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&fired);
        sched.schedule(
            Duration::from_millis(100),
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        sched.advance(Duration::from_millis(99));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        sched.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let sched = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&fired);
        let id = sched.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );
        sched.cancel(id);

        sched.advance(Duration::from_millis(200));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let sched = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("b", 20u64), ("a", 10), ("c", 30)] {
            let o = Arc::clone(&order);
            sched.schedule(
                Duration::from_millis(delay),
                Box::new(move || o.lock().push(label)),
            );
        }

        sched.advance(Duration::from_millis(100));
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_task_can_reschedule_itself() {
        let sched = Arc::new(ManualScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&sched);
        let f = Arc::clone(&fired);
        sched.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
                let f2 = Arc::clone(&f);
                s.schedule(
                    Duration::from_millis(10),
                    Box::new(move || {
                        f2.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        // Both the original and the rescheduled timer fit in one advance.
        sched.advance(Duration::from_millis(25));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clock_reads_deadline_while_firing() {
        let sched = Arc::new(ManualScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&sched);
        let v = Arc::clone(&seen);
        sched.schedule(
            Duration::from_millis(40),
            Box::new(move || v.lock().push(s.now())),
        );

        sched.advance(Duration::from_millis(100));
        assert_eq!(*seen.lock(), vec![Duration::from_millis(40)]);
        assert_eq!(sched.now(), Duration::from_millis(100));
    }
}
