//! Live-data synchronization for the reservation collection.
//!
//! The synchronizer keeps a consuming query cache fresh using the cheapest
//! mechanism that is currently working:
//! - a push subscription to the backend's change feed, when healthy;
//! - an escalating-interval polling fallback, whenever it is not.
//!
//! Push-channel failures are never surfaced to callers; every failure path
//! degrades to polling, and reconnection promotes back to push mode.
//!
//! # Example
//!
//! ```ignore
//! let sync = LiveSynchronizer::new(
//!     SyncConfig::default(),
//!     backend,
//!     cache,
//!     Arc::new(ThreadScheduler::new()),
//! );
//!
//! sync.start();
//! // ... the cache is invalidated whenever reservations change ...
//! sync.stop();
//! ```

mod synchronizer;

pub use synchronizer::{LiveSynchronizer, SyncConfig};
