//! Database row models for the orders and tickets tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{CartItem, Order, OrderId, OrderStatus};
use crate::error::EngineError;

/// An order row from the `orders` table.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    /// Order identifier.
    pub id: Uuid,
    /// Buyer identifier.
    pub buyer_id: Uuid,
    /// Event identifier.
    pub event_id: Uuid,
    /// Session identifier.
    pub session_id: String,
    /// Status string (`pending`/`completed`/`cancelled`).
    pub status: String,
    /// Pre-discount subtotal.
    pub subtotal: Decimal,
    /// Applied discount id, if any.
    pub discount_id: Option<String>,
    /// Applied discount code, if any.
    pub discount_code: Option<String>,
    /// Monetary reduction.
    pub discount_amount: Decimal,
    /// Final price.
    pub total: Decimal,
    /// External payment-authorization id, if any.
    pub payment_authorization_id: Option<String>,
    /// Ledger creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EngineError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            EngineError::Ledger(format!("order {} has unknown status {}", row.id, row.status))
        })?;
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            buyer_id: row.buyer_id,
            event_id: row.event_id,
            session_id: row.session_id,
            status,
            subtotal: row.subtotal,
            discount_id: row.discount_id,
            discount_code: row.discount_code,
            discount_amount: row.discount_amount,
            total: row.total,
            payment_authorization_id: row.payment_authorization_id,
            created_at: row.created_at,
        })
    }
}

/// A cart item row from the `order_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
    /// Owning order.
    pub order_id: Uuid,
    /// Seat identifier.
    pub seat_id: String,
    /// Tier identifier.
    pub tier_id: String,
    /// Price at cart-assembly time.
    pub price: Decimal,
}

impl From<OrderItemRow> for CartItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            seat_id: row.seat_id,
            tier_id: row.tier_id,
            price: row.price,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn row(status: &str) -> OrderRow {
        OrderRow {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            session_id: "evening".to_string(),
            status: status.to_string(),
            subtotal: Decimal::from(100),
            discount_id: None,
            discount_code: None,
            discount_amount: Decimal::ZERO,
            total: Decimal::from(100),
            payment_authorization_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_order() {
        let order = Order::try_from(row("pending")).ok();
        let Some(order) = order else {
            panic!("conversion failed");
        };
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn unknown_status_is_a_ledger_error() {
        let result = Order::try_from(row("refunded"));
        assert!(matches!(result, Err(EngineError::Ledger(_))));
    }
}
