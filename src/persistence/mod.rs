//! Persistence layer: the order/ticket ledger.
//!
//! [`OrderStore`] is the engine's contract with the relational ledger.
//! Every state transition goes through a "only if currently pending"
//! check-and-set, which is the system's optimistic-concurrency mechanism:
//! a stale caller's transition fails cleanly once another one has landed.
//! The concrete implementation uses `sqlx::PgPool`; an in-memory mirror
//! backs unit tests.

pub mod memory;
pub mod models;
pub mod postgres;

use std::future::Future;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{CartItem, Order, OrderId, OrderPatch, OrderStatus, Ticket};
use crate::error::EngineError;

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

/// Ledger contract for orders and tickets.
///
/// Check-and-set methods return `Ok(false)` when the order exists but is
/// no longer `pending`; callers translate that into a state-conflict
/// error after re-reading the actual status.
pub trait OrderStore: Send + Sync {
    /// Writes the order row and its cart items in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn create_order(
        &self,
        order: &Order,
        items: &[CartItem],
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Fetches an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, EngineError>> + Send;

    /// Fetches the cart items stored with an order at placement.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn items_for_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Vec<CartItem>, EngineError>> + Send;

    /// Applies a patch, only if the order is still `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn update_order_if_pending(
        &self,
        id: OrderId,
        patch: &OrderPatch,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Persists discount bookkeeping, only if the order is still `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn set_discount_if_pending(
        &self,
        id: OrderId,
        discount_id: &str,
        code: &str,
        amount: Decimal,
        total: Decimal,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Records the external payment-authorization id on the order.
    ///
    /// Authorization bookkeeping is permitted in any state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn set_payment_authorization(
        &self,
        id: OrderId,
        authorization_id: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Transitions the order to `to`, only if it is still `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn transition_if_pending(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Atomically completes the order and issues its tickets.
    ///
    /// The status flip and ticket inserts happen in one transaction so a
    /// completed order can never exist without its tickets.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn complete_order_if_pending(
        &self,
        id: OrderId,
        tickets: &[Ticket],
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Returns the subset of `seat_ids` that already belong to a ticket of
    /// a completed order for `event_id`.
    ///
    /// Used as a pre-flight defense against stale locks: a seat sold to a
    /// completed order stays unavailable even after its lock TTL expires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    fn seats_with_completed_order(
        &self,
        event_id: Uuid,
        seat_ids: &[String],
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;
}
