//! Domain events reflecting order state mutations.
//!
//! Every state change emits an [`OrderEvent`] through the
//! [`super::EventBus`]. Delivery is fire-and-forget from the engine's
//! perspective: downstream consumers (notifications, analytics) subscribe,
//! and a publish with no receivers is silently dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::OrderId;

/// Domain event emitted after every order state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum OrderEvent {
    /// Emitted when a placement passes seat-locking and is persisted.
    OrderPlaced {
        /// Order identifier.
        order_id: OrderId,
        /// Event the seats belong to.
        event_id: uuid::Uuid,
        /// Number of seats locked.
        seat_count: usize,
        /// Pre-discount subtotal.
        subtotal: Decimal,
        /// Placement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a pending order is patched.
    OrderUpdated {
        /// Order identifier.
        order_id: OrderId,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a promo code is applied.
    PromoApplied {
        /// Order identifier.
        order_id: OrderId,
        /// The applied promo code.
        code: String,
        /// Computed reduction.
        amount: Decimal,
        /// Application timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted once a payment authorization exists for the order.
    PaymentAuthorized {
        /// Order identifier.
        order_id: OrderId,
        /// External authorization identifier.
        authorization_id: String,
        /// Authorization timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when checkout finalizes the order.
    OrderCompleted {
        /// Order identifier.
        order_id: OrderId,
        /// Number of tickets issued.
        ticket_count: usize,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when the order is cancelled and its seats released.
    OrderCancelled {
        /// Order identifier.
        order_id: OrderId,
        /// Cancellation timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    /// Returns the order ID associated with this event.
    #[must_use]
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::OrderPlaced { order_id, .. }
            | Self::OrderUpdated { order_id, .. }
            | Self::PromoApplied { order_id, .. }
            | Self::PaymentAuthorized { order_id, .. }
            | Self::OrderCompleted { order_id, .. }
            | Self::OrderCancelled { order_id, .. } => *order_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order_placed",
            Self::OrderUpdated { .. } => "order_updated",
            Self::PromoApplied { .. } => "promo_applied",
            Self::PaymentAuthorized { .. } => "payment_authorized",
            Self::OrderCompleted { .. } => "order_completed",
            Self::OrderCancelled { .. } => "order_cancelled",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn order_placed_event_type() {
        let event = OrderEvent::OrderPlaced {
            order_id: OrderId::new(),
            event_id: uuid::Uuid::new_v4(),
            seat_count: 2,
            subtotal: Decimal::from(100),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "order_placed");
    }

    #[test]
    fn promo_applied_serializes() {
        let event = OrderEvent::PromoApplied {
            order_id: OrderId::new(),
            code: "SUMMER20".to_string(),
            amount: Decimal::from(20),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("promo_applied"));
        assert!(json.contains("SUMMER20"));
    }

    #[test]
    fn order_id_accessor() {
        let id = OrderId::new();
        let event = OrderEvent::OrderCancelled {
            order_id: id,
            timestamp: Utc::now(),
        };
        assert_eq!(event.order_id(), id);
    }
}
