//! In-memory implementation of the order ledger.
//!
//! Mirrors the semantics of the PostgreSQL store — including the
//! check-and-set transition guards and the atomic complete-plus-tickets
//! step — behind a single async `RwLock`. Used by unit tests.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::OrderStore;
use crate::domain::{CartItem, Order, OrderId, OrderPatch, OrderStatus, Ticket};
use crate::error::EngineError;

#[derive(Debug, Clone)]
struct Entry {
    order: Order,
    items: Vec<CartItem>,
    tickets: Vec<Ticket>,
}

/// Map-backed order ledger with the same observable behavior as
/// [`super::PostgresOrderStore`].
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemoryOrderStore {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tickets issued for an order. Test helper.
    pub async fn tickets_for_order(&self, id: OrderId) -> Vec<Ticket> {
        let entries = self.entries.read().await;
        entries
            .get(id.as_uuid())
            .map(|e| e.tickets.clone())
            .unwrap_or_default()
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: &Order, items: &[CartItem]) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(order.id.as_uuid()) {
            return Err(EngineError::Ledger(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        entries.insert(
            *order.id.as_uuid(),
            Entry {
                order: order.clone(),
                items: items.to_vec(),
                tickets: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, EngineError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id.as_uuid()).map(|e| e.order.clone()))
    }

    async fn items_for_order(&self, id: OrderId) -> Result<Vec<CartItem>, EngineError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(id.as_uuid())
            .map(|e| e.items.clone())
            .unwrap_or_default())
    }

    async fn update_order_if_pending(
        &self,
        id: OrderId,
        patch: &OrderPatch,
    ) -> Result<bool, EngineError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id.as_uuid()) else {
            return Ok(false);
        };
        if entry.order.status != OrderStatus::Pending {
            return Ok(false);
        }
        if let Some(buyer_id) = patch.buyer_id {
            entry.order.buyer_id = buyer_id;
        }
        if let Some(session_id) = &patch.session_id {
            entry.order.session_id = session_id.clone();
        }
        Ok(true)
    }

    async fn set_discount_if_pending(
        &self,
        id: OrderId,
        discount_id: &str,
        code: &str,
        amount: Decimal,
        total: Decimal,
    ) -> Result<bool, EngineError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id.as_uuid()) else {
            return Ok(false);
        };
        if entry.order.status != OrderStatus::Pending {
            return Ok(false);
        }
        entry.order.discount_id = Some(discount_id.to_string());
        entry.order.discount_code = Some(code.to_string());
        entry.order.discount_amount = amount;
        entry.order.total = total;
        Ok(true)
    }

    async fn set_payment_authorization(
        &self,
        id: OrderId,
        authorization_id: &str,
    ) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id.as_uuid()) {
            entry.order.payment_authorization_id = Some(authorization_id.to_string());
        }
        Ok(())
    }

    async fn transition_if_pending(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<bool, EngineError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id.as_uuid()) else {
            return Ok(false);
        };
        if entry.order.status != OrderStatus::Pending {
            return Ok(false);
        }
        entry.order.status = to;
        Ok(true)
    }

    async fn complete_order_if_pending(
        &self,
        id: OrderId,
        tickets: &[Ticket],
    ) -> Result<bool, EngineError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id.as_uuid()) else {
            return Ok(false);
        };
        if entry.order.status != OrderStatus::Pending {
            return Ok(false);
        }
        entry.order.status = OrderStatus::Completed;
        entry.tickets = tickets.to_vec();
        Ok(true)
    }

    async fn seats_with_completed_order(
        &self,
        event_id: Uuid,
        seat_ids: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let entries = self.entries.read().await;
        let mut taken = Vec::new();
        for entry in entries.values() {
            if entry.order.status != OrderStatus::Completed {
                continue;
            }
            for ticket in &entry.tickets {
                if ticket.event_id == event_id && seat_ids.contains(&ticket.seat_id) {
                    taken.push(ticket.seat_id.clone());
                }
            }
        }
        taken.sort();
        taken.dedup();
        Ok(taken)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(seat: &str) -> CartItem {
        CartItem {
            seat_id: seat.to_string(),
            tier_id: "ga".to_string(),
            price: Decimal::from(50),
        }
    }

    fn order(items: &[CartItem]) -> Order {
        Order::new(Uuid::new_v4(), Uuid::new_v4(), "evening".to_string(), items)
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let store = InMemoryOrderStore::new();
        let items = vec![item("s1"), item("s2")];
        let order = order(&items);

        assert!(store.create_order(&order, &items).await.is_ok());

        let fetched = store.get_order(order.id).await.ok().flatten();
        let Some(fetched) = fetched else {
            panic!("order not found");
        };
        assert_eq!(fetched.subtotal, Decimal::from(100));

        let stored_items = store.items_for_order(order.id).await.unwrap_or_default();
        assert_eq!(stored_items.len(), 2);
    }

    #[tokio::test]
    async fn transition_cas_rejects_second_transition() {
        let store = InMemoryOrderStore::new();
        let items = vec![item("s1")];
        let order = order(&items);
        let _ = store.create_order(&order, &items).await;

        let first = store
            .transition_if_pending(order.id, OrderStatus::Cancelled)
            .await;
        assert_eq!(first.ok(), Some(true));

        let second = store
            .transition_if_pending(order.id, OrderStatus::Completed)
            .await;
        assert_eq!(second.ok(), Some(false));
    }

    #[tokio::test]
    async fn complete_issues_tickets_atomically() {
        let store = InMemoryOrderStore::new();
        let items = vec![item("s1"), item("s2")];
        let order = order(&items);
        let _ = store.create_order(&order, &items).await;

        let now = Utc::now();
        let tickets: Vec<Ticket> = items.iter().map(|i| Ticket::issue(&order, i, now)).collect();

        let done = store.complete_order_if_pending(order.id, &tickets).await;
        assert_eq!(done.ok(), Some(true));
        assert_eq!(store.tickets_for_order(order.id).await.len(), 2);

        let taken = store
            .seats_with_completed_order(order.event_id, &["s1".to_string(), "s9".to_string()])
            .await
            .unwrap_or_default();
        assert_eq!(taken, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_order_has_no_completed_seats() {
        let store = InMemoryOrderStore::new();
        let items = vec![item("s1")];
        let order = order(&items);
        let _ = store.create_order(&order, &items).await;
        let _ = store
            .transition_if_pending(order.id, OrderStatus::Cancelled)
            .await;

        let taken = store
            .seats_with_completed_order(order.event_id, &["s1".to_string()])
            .await
            .unwrap_or_default();
        assert!(taken.is_empty());
    }
}
