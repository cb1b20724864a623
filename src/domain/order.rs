//! Order, cart item, and ticket types.
//!
//! An [`Order`] is the persistent ledger row for one placement. Its cart
//! items are stored alongside it at placement time; [`Ticket`] rows are
//! only issued when the order is finalized at checkout (join-based seat
//! ownership: a seat belongs to whoever holds a ticket for it on a
//! completed order).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderId;

/// Lifecycle status of an order.
///
/// Transitions are strictly `Pending → Completed` or `Pending → Cancelled`;
/// both terminal states are immutable except for payment-authorization
/// bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Seats are locked and the ledger row is written; awaiting payment.
    Pending,
    /// Checkout succeeded; seats are permanently consumed.
    Completed,
    /// Cancelled by the buyer, an operator, or a failed payment.
    Cancelled,
}

impl OrderStatus {
    /// Returns the status as the string stored in the ledger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a ledger status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One seat in a cart: the seat, its pricing tier, and the tier price at
/// the time the cart was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Venue seat identifier (e.g. `"A-12"`).
    pub seat_id: String,
    /// Pricing tier identifier (e.g. `"vip"`).
    pub tier_id: String,
    /// Tier price at cart-assembly time.
    pub price: Decimal,
}

/// Persistent ledger row for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique, immutable order identifier.
    pub id: OrderId,
    /// Buyer identifier.
    pub buyer_id: Uuid,
    /// Event identifier.
    pub event_id: Uuid,
    /// Session (showtime) identifier within the event.
    pub session_id: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Pre-discount sum of seat-tier prices.
    pub subtotal: Decimal,
    /// Identifier of the applied discount, if any.
    pub discount_id: Option<String>,
    /// Code of the applied discount, if any.
    pub discount_code: Option<String>,
    /// Monetary reduction; `0 ≤ discount_amount ≤ subtotal`.
    pub discount_amount: Decimal,
    /// Final price: `subtotal − discount_amount`.
    pub total: Decimal,
    /// External payment-authorization identifier, once one exists.
    pub payment_authorization_id: Option<String>,
    /// Ledger creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new pending order for the given cart, computing the
    /// subtotal from the item prices.
    #[must_use]
    pub fn new(buyer_id: Uuid, event_id: Uuid, session_id: String, items: &[CartItem]) -> Self {
        let subtotal: Decimal = items.iter().map(|i| i.price).sum();
        Self {
            id: OrderId::new(),
            buyer_id,
            event_id,
            session_id,
            status: OrderStatus::Pending,
            subtotal,
            discount_id: None,
            discount_code: None,
            discount_amount: Decimal::ZERO,
            total: subtotal,
            payment_authorization_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Mutable fields of a pending order.
///
/// `None` fields are left unchanged. Only applied while the order is
/// `pending`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    /// Transfer the order to a different buyer.
    pub buyer_id: Option<Uuid>,
    /// Move the order to a different session of the same event.
    pub session_id: Option<String>,
}

impl OrderPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buyer_id.is_none() && self.session_id.is_none()
    }
}

/// Issued ticket: one row per seat in a completed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier.
    pub id: Uuid,
    /// Order the ticket belongs to.
    pub order_id: OrderId,
    /// Event the seat belongs to.
    pub event_id: Uuid,
    /// Seat identifier.
    pub seat_id: String,
    /// Pricing tier the seat was sold under.
    pub tier_id: String,
    /// Price at purchase.
    pub price: Decimal,
    /// Issuance timestamp (checkout time).
    pub issued_at: DateTime<Utc>,
    /// Whether the ticket has been checked in at the venue.
    pub checked_in: bool,
}

impl Ticket {
    /// Issues a ticket for one cart item of a finalized order.
    #[must_use]
    pub fn issue(order: &Order, item: &CartItem, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            event_id: order.event_id,
            seat_id: item.seat_id.clone(),
            tier_id: item.tier_id.clone(),
            price: item.price,
            issued_at,
            checked_in: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn item(seat: &str, price: u32) -> CartItem {
        CartItem {
            seat_id: seat.to_string(),
            tier_id: "ga".to_string(),
            price: Decimal::from(price),
        }
    }

    #[test]
    fn new_order_computes_subtotal() {
        let order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "evening".to_string(),
            &[item("A-1", 50), item("A-2", 50)],
        );
        assert_eq!(order.subtotal, Decimal::from(100));
        assert_eq!(order.total, Decimal::from(100));
        assert_eq!(order.discount_amount, Decimal::ZERO);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_authorization_id.is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn issue_ticket_copies_seat_and_price() {
        let order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "matinee".to_string(),
            &[item("B-7", 35)],
        );
        let Some(first) = [item("B-7", 35)].first().cloned() else {
            panic!("item exists");
        };
        let ticket = Ticket::issue(&order, &first, Utc::now());
        assert_eq!(ticket.order_id, order.id);
        assert_eq!(ticket.event_id, order.event_id);
        assert_eq!(ticket.seat_id, "B-7");
        assert_eq!(ticket.price, Decimal::from(35));
        assert!(!ticket.checked_in);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(OrderPatch::default().is_empty());
        let patch = OrderPatch {
            buyer_id: Some(Uuid::new_v4()),
            session_id: None,
        };
        assert!(!patch.is_empty());
    }
}
