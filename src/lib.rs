//! # roomsync
//!
//! Client-side data layer for a room-reservation application over a hosted
//! backend. The core is the [`LiveSynchronizer`]: it keeps a local query
//! cache fresh for the remote reservation collection by preferring a
//! push-based change feed and degrading to escalating-interval polling
//! whenever the channel is not confirmed healthy, promoting back to push
//! mode on reconnection.
//!
//! ## Core Concepts
//!
//! - **Push channel**: long-lived connection over which the backend sends
//!   change notifications; any event is treated as an invalidation signal
//! - **Polling fallback**: timer-driven staleness marking when push is not
//!   healthy; interval escalates 30s → 120s with failed reconnect attempts
//! - **Cache invalidation**: the only outbound effect — mark a query key
//!   stale so the consuming layer refetches
//!
//! ## Example
//!
//! ```ignore
//! use roomsync::{LiveSynchronizer, QueryCache, SyncConfig, ThreadScheduler};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(QueryCache::default());
//! let sync = LiveSynchronizer::new(
//!     SyncConfig::default(),
//!     backend,                            // impl BackendClient
//!     Arc::clone(&cache) as _,
//!     Arc::new(ThreadScheduler::new()),
//! );
//!
//! sync.start();                           // on mount
//! // ... cache entries go stale whenever reservations change ...
//! sync.stop();                            // on unmount
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod reservations;
pub mod scheduler;
pub mod sync;
pub mod types;

// Re-exports
pub use backend::{BackendClient, EventCallback, PushChannel, ReservationApi, StatusCallback};
pub use cache::{Invalidate, QueryCache};
pub use error::{Result, SyncError};
pub use reservations::ReservationService;
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler, TimerId};
pub use sync::{LiveSynchronizer, SyncConfig};
pub use types::*;
