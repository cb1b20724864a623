//! Seat-lock store: exclusive, time-bounded holds on sets of seats.
//!
//! The lock store is the only exclusion mechanism between concurrent
//! placements. A lock is a key `seat_lock:<seat_id>` whose value is the
//! owning order id; existence of the key is the sole availability signal.
//! TTL expiry is the only recovery path for abandoned locks — there is no
//! heartbeat or renewal.

pub mod memory;
pub mod redis;

use std::future::Future;

use crate::domain::OrderId;
use crate::error::EngineError;

pub use memory::InMemorySeatLockStore;
pub use redis::RedisSeatLockStore;

/// Key namespace prefix for seat locks.
pub const SEAT_LOCK_PREFIX: &str = "seat_lock:";

/// Builds the lock-store key for a seat.
#[must_use]
pub fn seat_key(seat_id: &str) -> String {
    format!("{SEAT_LOCK_PREFIX}{seat_id}")
}

/// Result of a read-only availability probe.
#[derive(Debug, Clone)]
pub struct SeatAvailability {
    /// `true` when every probed seat is free.
    pub all_available: bool,
    /// The seats currently held by some order.
    pub unavailable: Vec<String>,
}

/// Atomic multi-seat lock store.
///
/// # Contract
///
/// - `lock` acquires every seat or none: there is no partial-lock outcome
///   visible to callers. `Ok(false)` means at least one seat is held by a
///   different owner; `Err` is reserved for store communication failures.
/// - `unlock` releases only seats whose stored owner matches the caller,
///   silently skipping the rest. It is idempotent.
/// - `check_availability` must not create or mutate any lock.
///
/// The owning order id is the capability token: any caller presenting it
/// may release the seats. This mirrors the trust model of the rest of the
/// engine and is deliberately not authenticated further.
pub trait SeatLockStore: Send + Sync {
    /// Atomically acquires exclusive holds on every seat in `seat_ids`
    /// under `owner` with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockStore`] on store communication failure.
    fn lock(
        &self,
        seat_ids: &[String],
        owner: OrderId,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Releases every seat in `seat_ids` currently held by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockStore`] on store communication failure.
    /// Never fails for seats that are already unlocked or held by another
    /// owner.
    fn unlock(
        &self,
        seat_ids: &[String],
        owner: OrderId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Read-only probe for which of `seat_ids` are currently held.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockStore`] on store communication failure.
    fn check_availability(
        &self,
        seat_ids: &[String],
    ) -> impl Future<Output = Result<SeatAvailability, EngineError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_key_is_namespaced() {
        assert_eq!(seat_key("A-12"), "seat_lock:A-12");
    }
}
