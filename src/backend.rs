//! Capability traits for the hosted backend.
//!
//! The real backend (managed auth, managed relational store, managed realtime
//! channel) is an external service. This module pins down the only surface the
//! sync layer is allowed to touch: opening a named change feed, registering
//! callbacks on it, and a narrow request/response CRUD boundary for
//! reservations. Everything else about the backend stays opaque.

use crate::error::Result;
use crate::types::{
    ChangeEvent, ChangeFilter, ChannelStatus, NewReservation, Reservation, ReservationId,
    ReservationPatch,
};

/// Callback invoked for every change notification delivered on a channel.
pub type EventCallback = Box<dyn Fn(ChangeEvent) + Send + Sync>;

/// Callback invoked when the channel's connection status changes.
///
/// The second argument carries the backend's error description, if any
/// (only meaningful for [`ChannelStatus::ChannelError`]).
pub type StatusCallback = Box<dyn Fn(ChannelStatus, Option<String>) + Send + Sync>;

/// A long-lived push channel over which the backend proactively sends
/// change notifications for one named collection.
///
/// Ownership of the underlying connection stays with the backend client
/// library; this handle exists for callback wiring and teardown only.
pub trait PushChannel: Send {
    /// Subscribe to change notifications matching `filter`.
    fn subscribe(&mut self, filter: ChangeFilter, on_event: EventCallback) -> Result<()>;

    /// Register the status-transition callback.
    fn on_status(&mut self, callback: StatusCallback);

    /// Tear the channel down. Must be safe to call at any point, including
    /// before `subscribe` succeeded.
    fn unsubscribe(&mut self);
}

/// Client for the hosted backend's realtime surface.
pub trait BackendClient: Send + Sync {
    /// Open a channel on the named change feed.
    fn channel(&self, name: &str) -> Box<dyn PushChannel>;
}

/// The reservation CRUD boundary.
///
/// Auth, validation, and schema concerns live behind this trait on the
/// backend side; callers only see request/response.
pub trait ReservationApi: Send + Sync {
    fn list(&self) -> Result<Vec<Reservation>>;
    fn create(&self, input: NewReservation) -> Result<Reservation>;
    fn update(&self, id: ReservationId, patch: ReservationPatch) -> Result<Reservation>;
    fn cancel(&self, id: ReservationId) -> Result<()>;
}
