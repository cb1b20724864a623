//! In-memory implementation of the seat-lock store.
//!
//! Honors the same contract as the Redis store, including TTL expiry,
//! behind a single async mutex — every operation observes and mutates the
//! map atomically with respect to other tasks. Used by unit tests and as
//! a single-process fallback.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{SeatAvailability, SeatLockStore};
use crate::domain::OrderId;
use crate::error::EngineError;

struct Hold {
    owner: OrderId,
    expires_at: Instant,
}

/// Mutex-protected seat-lock map with lazy TTL expiry.
#[derive(Debug)]
pub struct InMemorySeatLockStore {
    holds: Mutex<HashMap<String, Hold>>,
    ttl: Duration,
}

impl std::fmt::Debug for Hold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hold").field("owner", &self.owner).finish()
    }
}

impl InMemorySeatLockStore {
    /// Creates an empty store with the given lock TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            holds: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(hold: &Hold, now: Instant) -> bool {
        hold.expires_at > now
    }
}

impl SeatLockStore for InMemorySeatLockStore {
    async fn lock(&self, seat_ids: &[String], owner: OrderId) -> Result<bool, EngineError> {
        let mut holds = self.holds.lock().await;
        let now = Instant::now();

        // Phase 1: any live hold aborts with no side effects.
        if seat_ids
            .iter()
            .any(|seat| holds.get(seat).is_some_and(|h| Self::is_live(h, now)))
        {
            return Ok(false);
        }

        // Phase 2: take every seat.
        let expires_at = now + self.ttl;
        for seat in seat_ids {
            holds.insert(seat.clone(), Hold { owner, expires_at });
        }
        Ok(true)
    }

    async fn unlock(&self, seat_ids: &[String], owner: OrderId) -> Result<(), EngineError> {
        let mut holds = self.holds.lock().await;
        for seat in seat_ids {
            if holds.get(seat).is_some_and(|h| h.owner == owner) {
                holds.remove(seat);
            }
        }
        Ok(())
    }

    async fn check_availability(
        &self,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, EngineError> {
        let holds = self.holds.lock().await;
        let now = Instant::now();
        let unavailable: Vec<String> = seat_ids
            .iter()
            .filter(|seat| {
                holds
                    .get(seat.as_str())
                    .is_some_and(|h| Self::is_live(h, now))
            })
            .cloned()
            .collect();

        Ok(SeatAvailability {
            all_available: unavailable.is_empty(),
            unavailable,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn seats(ids: &[&str]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    fn store() -> InMemorySeatLockStore {
        InMemorySeatLockStore::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn lock_then_conflicting_lock_fails_entirely() {
        let store = store();
        let a = OrderId::new();
        let b = OrderId::new();

        assert_eq!(store.lock(&seats(&["s1", "s2"]), a).await.ok(), Some(true));

        // Overlap on s2: b gets nothing, including the free s3.
        assert_eq!(store.lock(&seats(&["s2", "s3"]), b).await.ok(), Some(false));

        let probe = store
            .check_availability(&seats(&["s3"]))
            .await
            .ok()
            .unwrap_or_else(|| panic!("probe failed"));
        assert!(probe.all_available);
    }

    #[tokio::test]
    async fn concurrent_overlapping_locks_grant_exactly_one() {
        let store = std::sync::Arc::new(store());
        let contested = seats(&["c1", "c2", "c3"]);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = std::sync::Arc::clone(&store);
            let ids = contested.clone();
            handles.push(tokio::spawn(
                async move { store.lock(&ids, OrderId::new()).await },
            ));
        }

        let mut granted = 0;
        for handle in handles {
            let Ok(Ok(result)) = handle.await else {
                panic!("lock task failed");
            };
            if result {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn unlock_by_non_owner_leaves_locks_intact() {
        let store = store();
        let a = OrderId::new();
        let b = OrderId::new();

        assert_eq!(store.lock(&seats(&["s1", "s2"]), a).await.ok(), Some(true));
        assert!(store.unlock(&seats(&["s1", "s2"]), b).await.is_ok());

        let probe = store
            .check_availability(&seats(&["s1", "s2"]))
            .await
            .ok()
            .unwrap_or_else(|| panic!("probe failed"));
        assert!(!probe.all_available);
        assert_eq!(probe.unavailable.len(), 2);
    }

    #[tokio::test]
    async fn unlock_is_idempotent() {
        let store = store();
        let a = OrderId::new();

        assert_eq!(store.lock(&seats(&["s1"]), a).await.ok(), Some(true));
        assert!(store.unlock(&seats(&["s1"]), a).await.is_ok());
        assert!(store.unlock(&seats(&["s1"]), a).await.is_ok());

        let probe = store
            .check_availability(&seats(&["s1"]))
            .await
            .ok()
            .unwrap_or_else(|| panic!("probe failed"));
        assert!(probe.all_available);
    }

    #[tokio::test]
    async fn expired_hold_is_treated_as_available() {
        let store = InMemorySeatLockStore::new(Duration::from_millis(10));
        let a = OrderId::new();
        let b = OrderId::new();

        assert_eq!(store.lock(&seats(&["s1"]), a).await.ok(), Some(true));
        tokio::time::sleep(Duration::from_millis(25)).await;

        let probe = store
            .check_availability(&seats(&["s1"]))
            .await
            .ok()
            .unwrap_or_else(|| panic!("probe failed"));
        assert!(probe.all_available);

        assert_eq!(store.lock(&seats(&["s1"]), b).await.ok(), Some(true));
    }

    #[tokio::test]
    async fn check_availability_does_not_mutate() {
        let store = store();
        let probe = store
            .check_availability(&seats(&["s1"]))
            .await
            .ok()
            .unwrap_or_else(|| panic!("probe failed"));
        assert!(probe.all_available);

        // Probing must not have created a hold.
        let a = OrderId::new();
        assert_eq!(store.lock(&seats(&["s1"]), a).await.ok(), Some(true));
    }
}
