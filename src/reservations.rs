//! Reservation CRUD service.
//!
//! A thin pass-through over the backend's [`ReservationApi`] with the query
//! cache wired in: reads serve from cache while it is fresh, mutations mark
//! the reservation query stale so collaborating views refetch. Constructed
//! explicitly and injected into callers; there is no global instance.

use crate::backend::ReservationApi;
use crate::cache::QueryCache;
use crate::error::Result;
use crate::types::{NewReservation, QueryKey, Reservation, ReservationId, ReservationPatch};
use std::sync::Arc;
use tracing::debug;

/// Dependency-injected reservation service.
pub struct ReservationService {
    api: Arc<dyn ReservationApi>,
    cache: Arc<QueryCache>,
    query_key: QueryKey,
}

impl ReservationService {
    /// Create a service caching under the default reservation query key.
    pub fn new(api: Arc<dyn ReservationApi>, cache: Arc<QueryCache>) -> Self {
        Self::with_query_key(api, cache, QueryKey::reservations())
    }

    pub fn with_query_key(
        api: Arc<dyn ReservationApi>,
        cache: Arc<QueryCache>,
        query_key: QueryKey,
    ) -> Self {
        Self {
            api,
            cache,
            query_key,
        }
    }

    /// The query key this service caches under (and the synchronizer
    /// invalidates).
    pub fn query_key(&self) -> &QueryKey {
        &self.query_key
    }

    /// List reservations, serving from cache while it is fresh.
    pub fn list(&self) -> Result<Vec<Reservation>> {
        if let Some((value, stale)) = self.cache.get(&self.query_key) {
            if !stale {
                return Ok(serde_json::from_value(value)?);
            }
        }

        debug!(key = %self.query_key, "cache miss or stale; fetching reservations");
        let fresh = self.api.list()?;
        self.cache
            .put(self.query_key.clone(), serde_json::to_value(&fresh)?);
        Ok(fresh)
    }

    /// Create a reservation and mark the cached query stale.
    pub fn create(&self, input: NewReservation) -> Result<Reservation> {
        let created = self.api.create(input)?;
        self.cache.mark_stale(&self.query_key);
        Ok(created)
    }

    /// Apply a partial update and mark the cached query stale.
    pub fn update(&self, id: ReservationId, patch: ReservationPatch) -> Result<Reservation> {
        let updated = self.api.update(id, patch)?;
        self.cache.mark_stale(&self.query_key);
        Ok(updated)
    }

    /// Cancel a reservation and mark the cached query stale.
    pub fn cancel(&self, id: ReservationId) -> Result<()> {
        self.api.cancel(id)?;
        self.cache.mark_stale(&self.query_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::types::Timestamp;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// In-memory stand-in for the backend CRUD surface.
    struct FakeApi {
        rows: Mutex<Vec<Reservation>>,
        next_id: AtomicU64,
        list_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    impl ReservationApi for FakeApi {
        fn list(&self) -> Result<Vec<Reservation>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().clone())
        }

        fn create(&self, input: NewReservation) -> Result<Reservation> {
            let reservation = Reservation {
                id: ReservationId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                room: input.room,
                title: input.title,
                start: input.start,
                end: input.end,
                created_by: input.created_by,
            };
            self.rows.lock().push(reservation.clone());
            Ok(reservation)
        }

        fn update(&self, id: ReservationId, patch: ReservationPatch) -> Result<Reservation> {
            let mut rows = self.rows.lock();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(SyncError::ReservationNotFound(id))?;
            if let Some(room) = patch.room {
                row.room = room;
            }
            if let Some(title) = patch.title {
                row.title = title;
            }
            if let Some(start) = patch.start {
                row.start = start;
            }
            if let Some(end) = patch.end {
                row.end = end;
            }
            Ok(row.clone())
        }

        fn cancel(&self, id: ReservationId) -> Result<()> {
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(SyncError::ReservationNotFound(id));
            }
            Ok(())
        }
    }

    fn booking(room: &str) -> NewReservation {
        NewReservation {
            room: room.to_string(),
            title: "sync review".to_string(),
            start: Timestamp(1_000),
            end: Timestamp(2_000),
            created_by: "ada".to_string(),
        }
    }

    fn service() -> (ReservationService, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::new());
        let cache = Arc::new(QueryCache::default());
        let service = ReservationService::new(Arc::clone(&api) as Arc<dyn ReservationApi>, cache);
        (service, api)
    }

    #[test]
    fn test_list_serves_from_cache_when_fresh() {
        let (service, api) = service();
        service.create(booking("meridian")).unwrap();

        let first = service.list().unwrap();
        let second = service.list().unwrap();

        assert_eq!(first, second);
        // Only the first list hits the backend.
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mutation_marks_query_stale() {
        let (service, api) = service();
        service.list().unwrap();

        service.create(booking("atrium")).unwrap();
        let rows = service.list().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].room, "atrium");
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_and_cancel_refetch() {
        let (service, _api) = service();
        let created = service.create(booking("meridian")).unwrap();
        service.list().unwrap();

        let patch = ReservationPatch {
            title: Some("retro".to_string()),
            ..Default::default()
        };
        service.update(created.id, patch).unwrap();
        assert_eq!(service.list().unwrap()[0].title, "retro");

        service.cancel(created.id).unwrap();
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_missing_reservation_errors() {
        let (service, _api) = service();
        let err = service.cancel(ReservationId(99)).unwrap_err();
        assert!(matches!(err, SyncError::ReservationNotFound(_)));
    }

    #[test]
    fn test_external_invalidation_forces_refetch() {
        let (_, api) = service();
        let cache = Arc::new(QueryCache::default());
        let service = ReservationService::new(
            Arc::clone(&api) as Arc<dyn ReservationApi>,
            Arc::clone(&cache),
        );
        drop(service.list().unwrap());

        // What the synchronizer does on a change event.
        cache.mark_stale(service.query_key());
        service.list().unwrap();

        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
    }
}
