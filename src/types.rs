//! Core types for the reservation sync layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a reservation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

impl fmt::Debug for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReservationId({})", self.0)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key identifying a cached query result in the consuming cache layer.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(pub String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        QueryKey(key.into())
    }

    /// The query key for the reservation collection.
    pub fn reservations() -> Self {
        QueryKey("reservations".to_string())
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryKey({})", self.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ts({})", self.0)
    }
}

/// A room reservation as stored by the remote backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub room: String,
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub created_by: String,
}

/// Input for creating a reservation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewReservation {
    pub room: String,
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub created_by: String,
}

/// Partial update for an existing reservation. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReservationPatch {
    pub room: Option<String>,
    pub title: Option<String>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

/// Connection state of the synchronizer's push channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel established yet (or torn down).
    Uninitialized,
    /// Push channel confirmed healthy; live events flowing.
    Subscribed,
    /// Channel closed by the backend.
    Closed,
    /// Channel reported an error.
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Subscribed => "subscribed",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
        };
        write!(f, "{}", s)
    }
}

/// Status notifications delivered by the push channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    Closed,
}

/// Kind of change observed on the remote collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification from the push channel.
///
/// The synchronizer treats any event as an invalidation signal and never
/// inspects the payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Raw row payload as sent by the backend, if any.
    pub payload: Option<serde_json::Value>,
}

/// Filter for a change-feed subscription.
#[derive(Clone, Debug, Default)]
pub struct ChangeFilter {
    /// Change kinds to receive (None = all kinds).
    pub kinds: Option<Vec<ChangeKind>>,
}

impl ChangeFilter {
    /// Subscribe to all change kinds (insert/update/delete).
    pub fn all() -> Self {
        Self { kinds: None }
    }

    /// Subscribe to specific change kinds.
    pub fn kinds(kinds: Vec<ChangeKind>) -> Self {
        Self { kinds: Some(kinds) }
    }

    /// Whether the filter accepts an event of the given kind.
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_all_matches_everything() {
        let filter = ChangeFilter::all();
        assert!(filter.matches(ChangeKind::Insert));
        assert!(filter.matches(ChangeKind::Update));
        assert!(filter.matches(ChangeKind::Delete));
    }

    #[test]
    fn test_filter_kinds_is_selective() {
        let filter = ChangeFilter::kinds(vec![ChangeKind::Delete]);
        assert!(filter.matches(ChangeKind::Delete));
        assert!(!filter.matches(ChangeKind::Insert));
    }

    #[test]
    fn test_reservation_roundtrip() {
        let r = Reservation {
            id: ReservationId(7),
            room: "meridian".to_string(),
            title: "standup".to_string(),
            start: Timestamp(1_000),
            end: Timestamp(2_000),
            created_by: "ada".to_string(),
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
