//! Order lifecycle service.
//!
//! Coordinates the seat-lock store, the order ledger, and the discount
//! service through one state machine: `pending → completed` (checkout) or
//! `pending → cancelled`. Placement is the only operation that acquires
//! seat locks; cancellation and checkout release them. Every mutation
//! publishes an [`OrderEvent`] on the bus.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::DiscountProvider;
use crate::domain::{CartItem, EventBus, Order, OrderEvent, OrderId, OrderPatch, OrderStatus, Ticket};
use crate::error::EngineError;
use crate::locking::{SeatAvailability, SeatLockStore};
use crate::persistence::OrderStore;
use crate::service::discount_engine;

/// Coordinates placements, updates, promos, cancellations, and checkout
/// finalization across the lock store and the ledger.
#[derive(Debug)]
pub struct OrderService<L, S, D> {
    locks: Arc<L>,
    store: Arc<S>,
    discounts: Arc<D>,
    events: EventBus,
}

impl<L, S, D> OrderService<L, S, D>
where
    L: SeatLockStore,
    S: OrderStore,
    D: DiscountProvider,
{
    /// Creates the service over the given collaborators.
    pub fn new(locks: Arc<L>, store: Arc<S>, discounts: Arc<D>, events: EventBus) -> Self {
        Self {
            locks,
            store,
            discounts,
            events,
        }
    }

    /// Returns the event bus mutations are published on.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Places a new order: validates the cart, locks every seat
    /// atomically, and writes the pending ledger row.
    ///
    /// If the ledger write fails after the locks were acquired, the locks
    /// are released before the error propagates so the seats do not stay
    /// held by an order that never existed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidRequest`] for an empty cart, duplicate
    ///   seats, or negative prices.
    /// - [`EngineError::SeatsUnavailable`] when any seat is locked by
    ///   another order or already sold.
    /// - [`EngineError::LockStore`] / [`EngineError::Ledger`] on
    ///   dependency failure.
    pub async fn place_order(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
        session_id: String,
        items: Vec<CartItem>,
    ) -> Result<Order, EngineError> {
        validate_cart(&items)?;
        let seat_ids: Vec<String> = items.iter().map(|i| i.seat_id.clone()).collect();

        // Seats sold to a completed order stay gone even after their lock
        // TTL expires; check the ledger before touching the lock store.
        let sold = self
            .store
            .seats_with_completed_order(event_id, &seat_ids)
            .await?;
        if !sold.is_empty() {
            return Err(EngineError::SeatsUnavailable(sold));
        }

        let order = Order::new(buyer_id, event_id, session_id, &items);

        let acquired = self.locks.lock(&seat_ids, order.id).await?;
        if !acquired {
            // Best effort: name the seats that caused the conflict.
            let probe = self.locks.check_availability(&seat_ids).await;
            let unavailable = match probe {
                Ok(SeatAvailability { unavailable, .. }) if !unavailable.is_empty() => unavailable,
                _ => seat_ids,
            };
            return Err(EngineError::SeatsUnavailable(unavailable));
        }

        if let Err(e) = self.store.create_order(&order, &items).await {
            warn!(order_id = %order.id, error = %e, "ledger write failed, releasing seat locks");
            if let Err(unlock_err) = self.locks.unlock(&seat_ids, order.id).await {
                warn!(order_id = %order.id, error = %unlock_err, "compensating unlock failed, locks will expire by TTL");
            }
            return Err(e);
        }

        info!(order_id = %order.id, seats = seat_ids.len(), subtotal = %order.subtotal, "order placed");
        self.events.publish(OrderEvent::OrderPlaced {
            order_id: order.id,
            event_id,
            seat_count: items.len(),
            subtotal: order.subtotal,
            timestamp: Utc::now(),
        });
        Ok(order)
    }

    /// Fetches an order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OrderNotFound`] when no such order exists.
    pub async fn get_order(&self, id: OrderId) -> Result<Order, EngineError> {
        self.store
            .get_order(id)
            .await?
            .ok_or(EngineError::OrderNotFound(*id.as_uuid()))
    }

    /// Patches a pending order's buyer or session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the order is no longer
    /// pending, [`EngineError::OrderNotFound`] when it does not exist.
    pub async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order, EngineError> {
        if patch.is_empty() {
            return self.get_order(id).await;
        }
        let updated = self.store.update_order_if_pending(id, &patch).await?;
        if !updated {
            return Err(self.state_conflict(id, "update").await?);
        }
        self.events.publish(OrderEvent::OrderUpdated {
            order_id: id,
            timestamp: Utc::now(),
        });
        self.get_order(id).await
    }

    /// Applies a promo code to a pending order.
    ///
    /// The discount is fetched from the discount service, evaluated
    /// against the cart, and its amount and the new total are persisted
    /// with a pending-only check-and-set. Applying a second code replaces
    /// the first. The usage-counter increment is best effort: a failure
    /// is logged and does not undo the application.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DiscountNotFound`] when no discount matches `code`.
    /// - [`EngineError::DiscountRejected`] when a precondition fails.
    /// - [`EngineError::InvalidState`] when the order is not pending.
    pub async fn apply_promo_code(&self, id: OrderId, code: &str) -> Result<Order, EngineError> {
        let order = self.get_order(id).await?;
        if order.status != OrderStatus::Pending {
            return Err(EngineError::InvalidState {
                order_id: *id.as_uuid(),
                status: order.status.to_string(),
                operation: "apply a promo to",
            });
        }

        let discount = self
            .discounts
            .fetch_by_code(code)
            .await?
            .ok_or_else(|| EngineError::DiscountNotFound(code.to_string()))?;

        let items = self.store.items_for_order(id).await?;
        let outcome =
            discount_engine::evaluate(Some(&discount), &items, &order.session_id, Utc::now())?;
        if !outcome.valid {
            return Err(EngineError::DiscountRejected(outcome.reason));
        }

        let total = (order.subtotal - outcome.amount).max(Decimal::ZERO);
        let applied = self
            .store
            .set_discount_if_pending(id, &discount.id, &discount.code, outcome.amount, total)
            .await?;
        if !applied {
            return Err(self.state_conflict(id, "apply a promo to").await?);
        }

        if let Err(e) = self.discounts.increment_usage(&discount.id).await {
            warn!(order_id = %id, discount_id = %discount.id, error = %e, "usage increment failed");
        }

        info!(order_id = %id, code, amount = %outcome.amount, "promo applied");
        self.events.publish(OrderEvent::PromoApplied {
            order_id: id,
            code: discount.code,
            amount: outcome.amount,
            timestamp: Utc::now(),
        });
        self.get_order(id).await
    }

    /// Records the external payment-authorization id on the order and
    /// publishes the corresponding event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] on database failure.
    pub async fn record_payment_authorization(
        &self,
        id: OrderId,
        authorization_id: &str,
    ) -> Result<(), EngineError> {
        self.store
            .set_payment_authorization(id, authorization_id)
            .await?;
        self.events.publish(OrderEvent::PaymentAuthorized {
            order_id: id,
            authorization_id: authorization_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Cancels a pending order and releases its seat locks.
    ///
    /// The ledger transition happens first; the seats are only released
    /// once the order can no longer complete. A cancelled order keeps its
    /// ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the order is not
    /// pending, [`EngineError::OrderNotFound`] when it does not exist.
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, EngineError> {
        let items = self.store.items_for_order(id).await?;

        let cancelled = match self
            .store
            .transition_if_pending(id, OrderStatus::Cancelled)
            .await
        {
            Ok(cancelled) => cancelled,
            Err(e) => {
                // The ledger state is unknown; free the seats rather than
                // leak a hold, and surface the primary error.
                self.release_seats(id, &items).await;
                return Err(e);
            }
        };
        if !cancelled {
            return Err(self.state_conflict(id, "cancel").await?);
        }

        self.release_seats(id, &items).await;

        info!(order_id = %id, "order cancelled");
        self.events.publish(OrderEvent::OrderCancelled {
            order_id: id,
            timestamp: Utc::now(),
        });
        self.get_order(id).await
    }

    /// Finalizes a pending order: flips it to `completed` and issues one
    /// ticket per seat in a single ledger transaction.
    ///
    /// Seat locks are deliberately not released here. The seats now
    /// belong to the completed order's tickets; the locks expire by TTL
    /// and the ledger pre-check in [`Self::place_order`] keeps the seats
    /// unavailable after that.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the order is not
    /// pending, [`EngineError::OrderNotFound`] when it does not exist.
    pub async fn checkout(&self, id: OrderId) -> Result<Order, EngineError> {
        let order = self.get_order(id).await?;
        let items = self.store.items_for_order(id).await?;

        let now = Utc::now();
        let tickets: Vec<Ticket> = items.iter().map(|i| Ticket::issue(&order, i, now)).collect();

        let completed = self.store.complete_order_if_pending(id, &tickets).await?;
        if !completed {
            return Err(self.state_conflict(id, "checkout").await?);
        }

        info!(order_id = %id, tickets = tickets.len(), "order completed");
        self.events.publish(OrderEvent::OrderCompleted {
            order_id: id,
            ticket_count: tickets.len(),
            timestamp: now,
        });
        self.get_order(id).await
    }

    /// Read-only availability probe over the lock store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockStore`] on store communication failure.
    pub async fn availability(&self, seat_ids: &[String]) -> Result<SeatAvailability, EngineError> {
        self.locks.check_availability(seat_ids).await
    }

    /// Best-effort lock release; an unreleased lock expires by TTL.
    async fn release_seats(&self, id: OrderId, items: &[CartItem]) {
        let seat_ids: Vec<String> = items.iter().map(|i| i.seat_id.clone()).collect();
        if let Err(e) = self.locks.unlock(&seat_ids, id).await {
            warn!(order_id = %id, error = %e, "seat unlock failed, locks will expire by TTL");
        }
    }

    /// Resolves a failed check-and-set into the precise error: the order
    /// is either gone or in a state the operation does not allow.
    async fn state_conflict(
        &self,
        id: OrderId,
        operation: &'static str,
    ) -> Result<EngineError, EngineError> {
        match self.store.get_order(id).await? {
            None => Ok(EngineError::OrderNotFound(*id.as_uuid())),
            Some(order) => Ok(EngineError::InvalidState {
                order_id: *id.as_uuid(),
                status: order.status.to_string(),
                operation,
            }),
        }
    }
}

fn validate_cart(items: &[CartItem]) -> Result<(), EngineError> {
    if items.is_empty() {
        return Err(EngineError::InvalidRequest("cart is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.seat_id.as_str()) {
            return Err(EngineError::InvalidRequest(format!(
                "duplicate seat in cart: {}",
                item.seat_id
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(EngineError::InvalidRequest(format!(
                "negative price for seat {}",
                item.seat_id
            )));
        }
    }
    Ok(())
}
