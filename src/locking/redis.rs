//! Redis implementation of the seat-lock store.
//!
//! Acquisition and release each run as a single server-side Lua script so
//! the check-then-set across multiple keys is atomic: two concurrent
//! placements for overlapping seats can never both observe "all free" and
//! both proceed. Availability probes use one `MGET`, which is atomic and
//! mutation-free.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use super::{SeatAvailability, SeatLockStore, seat_key};
use crate::domain::OrderId;
use crate::error::EngineError;

/// Phase 1: scan every requested key; abort with no side effects if any
/// exists. Phase 2: set every key to the owner with the TTL.
const ACQUIRE_SCRIPT: &str = r"
for i, key in ipairs(KEYS) do
    if redis.call('EXISTS', key) == 1 then
        return 0
    end
end
for i, key in ipairs(KEYS) do
    redis.call('SET', key, ARGV[1], 'PX', ARGV[2])
end
return 1
";

/// Deletes only keys whose stored value matches the caller's order id,
/// returning the number released.
const RELEASE_SCRIPT: &str = r"
local released = 0
for i, key in ipairs(KEYS) do
    if redis.call('GET', key) == ARGV[1] then
        redis.call('DEL', key)
        released = released + 1
    end
end
return released
";

/// Redis-backed seat-lock store.
///
/// Clones share the same [`ConnectionManager`], which multiplexes one
/// reconnecting connection.
#[derive(Clone)]
pub struct RedisSeatLockStore {
    conn: ConnectionManager,
    ttl_ms: u64,
    acquire: Script,
    release: Script,
}

impl std::fmt::Debug for RedisSeatLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSeatLockStore")
            .field("ttl_ms", &self.ttl_ms)
            .finish_non_exhaustive()
    }
}

impl RedisSeatLockStore {
    /// Connects to Redis and prepares the lock scripts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockStore`] if the URL is malformed or the
    /// connection cannot be established.
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, EngineError> {
        let client = Client::open(redis_url)
            .map_err(|e| EngineError::LockStore(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| EngineError::LockStore(format!("redis connection failed: {e}")))?;

        tracing::info!(ttl_secs, "seat lock store connected");

        Ok(Self {
            conn,
            ttl_ms: ttl_secs.saturating_mul(1000),
            acquire: Script::new(ACQUIRE_SCRIPT),
            release: Script::new(RELEASE_SCRIPT),
        })
    }
}

impl SeatLockStore for RedisSeatLockStore {
    async fn lock(&self, seat_ids: &[String], owner: OrderId) -> Result<bool, EngineError> {
        if seat_ids.is_empty() {
            return Ok(true);
        }
        let mut conn = self.conn.clone();
        let mut invocation = self.acquire.prepare_invoke();
        for seat_id in seat_ids {
            invocation.key(seat_key(seat_id));
        }
        invocation.arg(owner.to_string()).arg(self.ttl_ms);

        let acquired: i32 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| EngineError::LockStore(format!("lock script failed: {e}")))?;

        if acquired == 1 {
            tracing::debug!(%owner, seats = seat_ids.len(), "seat locks acquired");
            Ok(true)
        } else {
            tracing::debug!(%owner, seats = seat_ids.len(), "seat locks contended");
            Ok(false)
        }
    }

    async fn unlock(&self, seat_ids: &[String], owner: OrderId) -> Result<(), EngineError> {
        if seat_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut invocation = self.release.prepare_invoke();
        for seat_id in seat_ids {
            invocation.key(seat_key(seat_id));
        }
        invocation.arg(owner.to_string());

        let released: i32 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| EngineError::LockStore(format!("unlock script failed: {e}")))?;

        tracing::debug!(%owner, released, requested = seat_ids.len(), "seat locks released");
        Ok(())
    }

    async fn check_availability(
        &self,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, EngineError> {
        if seat_ids.is_empty() {
            return Ok(SeatAvailability {
                all_available: true,
                unavailable: Vec::new(),
            });
        }
        let mut conn = self.conn.clone();
        let keys: Vec<String> = seat_ids.iter().map(|s| seat_key(s)).collect();

        let values: Vec<Option<String>> = conn
            .mget(&keys)
            .await
            .map_err(|e| EngineError::LockStore(format!("availability probe failed: {e}")))?;

        let unavailable: Vec<String> = seat_ids
            .iter()
            .zip(values.iter())
            .filter(|(_, held)| held.is_some())
            .map(|(seat, _)| seat.clone())
            .collect();

        Ok(SeatAvailability {
            all_available: unavailable.is_empty(),
            unavailable,
        })
    }
}
