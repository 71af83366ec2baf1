//! The realtime-with-fallback subscription manager.

use crate::backend::{BackendClient, PushChannel};
use crate::cache::Invalidate;
use crate::scheduler::{Scheduler, TimerId};
use crate::types::{ChangeEvent, ChangeFilter, ChannelStatus, ConnectionState, QueryKey};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Base polling interval for the fallback.
const POLL_BASE: Duration = Duration::from_millis(30_000);

/// Interval escalation per reconnect attempt.
const POLL_STEP: Duration = Duration::from_millis(10_000);

/// Upper bound on the polling interval; bounds worst-case staleness.
const POLL_CAP: Duration = Duration::from_millis(120_000);

/// Grace period after `start()` before forcing the polling fallback.
const INITIAL_GRACE: Duration = Duration::from_millis(5_000);

/// Synchronizer configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Name of the backend change feed to subscribe to.
    pub channel: String,

    /// Query key invalidated when the collection changes.
    pub query_key: QueryKey,

    /// Base polling interval (attempt 0).
    pub poll_base: Duration,

    /// Interval added per reconnect attempt.
    pub poll_step: Duration,

    /// Polling interval cap.
    pub poll_cap: Duration,

    /// How long to wait after `start()` for the channel to report any status
    /// before polling is forced.
    pub initial_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel: "reservations-changes".to_string(),
            query_key: QueryKey::reservations(),
            poll_base: POLL_BASE,
            poll_step: POLL_STEP,
            poll_cap: POLL_CAP,
            initial_grace: INITIAL_GRACE,
        }
    }
}

impl SyncConfig {
    /// Polling interval after `attempts` failed reconnect attempts:
    /// `min(poll_base + attempts * poll_step, poll_cap)`.
    pub fn poll_interval(&self, attempts: u64) -> Duration {
        let base = self.poll_base.as_millis() as u64;
        let step = self.poll_step.as_millis() as u64;
        let cap = self.poll_cap.as_millis() as u64;
        Duration::from_millis(base.saturating_add(step.saturating_mul(attempts)).min(cap))
    }
}

/// Per-mount session state. Fully reset by `stop()`.
struct Inner {
    state: ConnectionState,
    /// Reconnect attempts since last reaching Subscribed. Only feeds the
    /// backoff interval; there is no retry cutoff.
    attempts: u64,
    poll_timer: Option<TimerId>,
    grace_timer: Option<TimerId>,
    channel: Option<Box<dyn PushChannel>>,
    /// Bumped whenever the polling timer is cancelled, and again on
    /// `stop()`. A tick that was already in flight on the scheduler thread
    /// sees a stale generation and becomes a no-op. Monotonic across
    /// mounts: `stop()` carries it forward instead of resetting it.
    poll_generation: u64,
    /// Mount counter, also monotonic across `stop()`. The deferred
    /// initial-fallback check captures it so a check still in flight at
    /// teardown cannot act on a dead (or restarted) session.
    epoch: u64,
    started: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            attempts: 0,
            poll_timer: None,
            grace_timer: None,
            channel: None,
            poll_generation: 0,
            epoch: 0,
            started: false,
        }
    }
}

/// Maintains a live view of the remote reservation collection for a
/// consuming cache layer.
///
/// Clones share the same session; the handle is cheap to pass into the
/// channel and timer callbacks.
#[derive(Clone)]
pub struct LiveSynchronizer {
    shared: Arc<Shared>,
}

struct Shared {
    config: SyncConfig,
    backend: Arc<dyn BackendClient>,
    cache: Arc<dyn Invalidate>,
    scheduler: Arc<dyn Scheduler>,
    inner: Mutex<Inner>,
}

impl LiveSynchronizer {
    /// Create a synchronizer. Nothing happens until [`start`](Self::start).
    pub fn new(
        config: SyncConfig,
        backend: Arc<dyn BackendClient>,
        cache: Arc<dyn Invalidate>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                backend,
                cache,
                scheduler,
                inner: Mutex::new(Inner::new()),
            }),
        }
    }

    /// Open the push subscription and schedule the deferred fallback check.
    ///
    /// Idempotent per mount: a second call before `stop()` is a no-op.
    /// A failed subscribe is logged and absorbed; the deferred check will
    /// engage polling.
    pub fn start(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.started {
                return;
            }
            inner.started = true;
        }

        // Wire the channel without holding the lock: some backends deliver
        // the first status synchronously from subscribe().
        let mut channel = self.shared.backend.channel(&self.shared.config.channel);

        let me = self.clone();
        channel.on_status(Box::new(move |status, error| {
            me.on_status_transition(status, error);
        }));

        let me = self.clone();
        let result = channel.subscribe(
            ChangeFilter::all(),
            Box::new(move |event| me.on_change_event(event)),
        );
        if let Err(e) = result {
            warn!(
                channel = %self.shared.config.channel,
                error = %e,
                "push subscription failed; polling will take over"
            );
        }

        let me = self.clone();
        let grace = self.shared.config.initial_grace;
        let mut inner = self.shared.inner.lock();
        if !inner.started {
            // stop() raced us while the channel was being wired.
            drop(inner);
            channel.unsubscribe();
            return;
        }
        inner.channel = Some(channel);
        let epoch = inner.epoch;
        inner.grace_timer = Some(
            self.shared
                .scheduler
                .schedule(grace, Box::new(move || me.deferred_check(epoch))),
        );
    }

    /// Handle a change notification from the push channel.
    ///
    /// Any event is an invalidation signal; the payload is never inspected.
    pub fn on_change_event(&self, _event: ChangeEvent) {
        debug!(key = %self.shared.config.query_key, "change event; marking query stale");
        self.shared.cache.invalidate(&self.shared.config.query_key);
    }

    /// Handle a connection-status transition from the push channel.
    pub fn on_status_transition(&self, status: ChannelStatus, error: Option<String>) {
        let mut inner = self.shared.inner.lock();
        if !inner.started {
            // Late status after teardown (e.g. the close ack).
            return;
        }

        match status {
            ChannelStatus::Subscribed => {
                inner.state = ConnectionState::Subscribed;
                inner.attempts = 0;
                self.cancel_poll_timer(&mut inner);
                debug!(channel = %self.shared.config.channel, "push channel subscribed");
            }
            ChannelStatus::ChannelError => {
                inner.state = ConnectionState::Errored;
                warn!(
                    channel = %self.shared.config.channel,
                    error = error.as_deref().unwrap_or("unknown"),
                    "push channel error; falling back to polling"
                );
                self.start_polling_locked(&mut inner);
            }
            ChannelStatus::Closed => {
                inner.state = ConnectionState::Closed;
                debug!(channel = %self.shared.config.channel, "push channel closed; falling back to polling");
                self.start_polling_locked(&mut inner);
            }
        }
    }

    /// Start the polling fallback. No-op if a polling timer is already
    /// scheduled.
    pub fn start_polling_fallback(&self) {
        let mut inner = self.shared.inner.lock();
        self.start_polling_locked(&mut inner);
    }

    /// Tear down: cancel both timers, then unsubscribe the channel, then
    /// reset session state. Safe and idempotent, including before `start()`.
    pub fn stop(&self) {
        let channel = {
            let mut inner = self.shared.inner.lock();
            if let Some(id) = inner.grace_timer.take() {
                self.shared.scheduler.cancel(id);
            }
            self.cancel_poll_timer(&mut inner);
            let channel = inner.channel.take();
            // The counters survive the reset: a cancel racing a tick the
            // scheduler worker already popped must leave that tick stale.
            let mut fresh = Inner::new();
            fresh.poll_generation = inner.poll_generation + 1;
            fresh.epoch = inner.epoch + 1;
            *inner = fresh;
            channel
        };

        // Unsubscribe outside the lock: the close may echo a final status.
        if let Some(mut channel) = channel {
            channel.unsubscribe();
        }
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Reconnect attempts since last reaching Subscribed.
    pub fn attempts(&self) -> u64 {
        self.shared.inner.lock().attempts
    }

    /// Whether a polling timer is currently scheduled.
    pub fn polling_active(&self) -> bool {
        self.shared.inner.lock().poll_timer.is_some()
    }

    // --- Internal ---

    /// Deferred initial-fallback check, `initial_grace` after `start()`.
    /// Covers a subscription that hangs without ever reporting a status.
    fn deferred_check(&self, epoch: u64) {
        let mut inner = self.shared.inner.lock();
        if epoch != inner.epoch {
            // stop() ran while this check was in flight.
            return;
        }
        inner.grace_timer = None;
        // Deliberately a state check, not a timer check: a channel that
        // errored and already started polling is left alone by the timer
        // guard inside start_polling_locked.
        if inner.state != ConnectionState::Subscribed {
            debug!(state = %inner.state, "no subscription confirmation; forcing polling fallback");
            self.start_polling_locked(&mut inner);
        }
    }

    fn start_polling_locked(&self, inner: &mut Inner) {
        if inner.poll_timer.is_some() {
            return;
        }

        let interval = self.shared.config.poll_interval(inner.attempts);
        let generation = inner.poll_generation;
        let me = self.clone();
        let id = self
            .shared
            .scheduler
            .schedule(interval, Box::new(move || me.poll_tick(generation)));
        inner.poll_timer = Some(id);
        debug!(
            interval_ms = interval.as_millis() as u64,
            attempts = inner.attempts,
            "polling fallback armed"
        );
    }

    fn poll_tick(&self, generation: u64) {
        let mut inner = self.shared.inner.lock();
        if generation != inner.poll_generation {
            // Cancelled while this tick was in flight.
            return;
        }
        inner.poll_timer = None;

        if inner.state != ConnectionState::Subscribed {
            self.shared.cache.invalidate(&self.shared.config.query_key);
            inner.attempts += 1;
        }

        // Re-arm at the freshly computed interval: 30s, 40s, ... capped.
        self.start_polling_locked(&mut inner);
    }

    fn cancel_poll_timer(&self, inner: &mut Inner) {
        if let Some(id) = inner.poll_timer.take() {
            self.shared.scheduler.cancel(id);
            inner.poll_generation += 1;
        }
    }
}
