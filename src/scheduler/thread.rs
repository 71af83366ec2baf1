//! Wall-clock scheduler backed by a worker thread.

use super::{Scheduler, Task, TimerId};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

enum Command {
    Schedule {
        id: TimerId,
        deadline: Instant,
        task: Task,
    },
    Cancel(TimerId),
    Shutdown,
}

struct TimerEntry {
    id: TimerId,
    deadline: Instant,
    task: Task,
}

/// Timer service running on a dedicated worker thread.
///
/// Scheduling and cancellation are channel sends and never block; tasks run
/// on the worker thread when their deadline passes. Dropping the scheduler
/// shuts the worker down and discards pending timers.
pub struct ThreadScheduler {
    tx: Sender<Command>,
    pending: Arc<AtomicUsize>,
    next_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker_pending = Arc::clone(&pending);
        let worker = std::thread::Builder::new()
            .name("roomsync-timer".to_string())
            .spawn(move || Self::run(rx, worker_pending))
            .ok();

        Self {
            tx,
            pending,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(worker),
        }
    }

    fn run(rx: Receiver<Command>, pending: Arc<AtomicUsize>) {
        let mut timers: Vec<TimerEntry> = Vec::new();
        loop {
            // Fire everything already due, earliest deadline first.
            let now = Instant::now();
            loop {
                let due = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= now)
                    .min_by_key(|(_, t)| (t.deadline, t.id.0))
                    .map(|(i, _)| i);
                match due {
                    Some(i) => {
                        let entry = timers.remove(i);
                        pending.fetch_sub(1, Ordering::SeqCst);
                        (entry.task)();
                    }
                    None => break,
                }
            }

            // Wait for the next command or the next deadline.
            let wait = timers
                .iter()
                .map(|t| t.deadline)
                .min()
                .map(|d| d.saturating_duration_since(Instant::now()));
            let cmd = match wait {
                Some(timeout) => match rx.recv_timeout(timeout) {
                    Ok(cmd) => cmd,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(cmd) => cmd,
                    Err(_) => break,
                },
            };

            match cmd {
                Command::Schedule { id, deadline, task } => {
                    timers.push(TimerEntry { id, deadline, task });
                }
                Command::Cancel(id) => {
                    let before = timers.len();
                    timers.retain(|t| t.id != id);
                    if timers.len() < before {
                        pending.fetch_sub(1, Ordering::SeqCst);
                    }
                }
                Command::Shutdown => break,
            }
        }
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: std::time::Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let deadline = Instant::now() + delay;
        self.pending.fetch_add(1, Ordering::SeqCst);
        let sent = self.tx.send(Command::Schedule { id, deadline, task });
        if sent.is_err() {
            // Worker already gone (shutdown); the timer will never fire.
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        id
    }

    fn cancel(&self, id: TimerId) {
        let _ = self.tx.send(Command::Cancel(id));
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}
