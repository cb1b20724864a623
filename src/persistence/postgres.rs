//! PostgreSQL implementation of the order ledger.
//!
//! Schema lives in `migrations/`. All guarded transitions are expressed
//! as `UPDATE ... WHERE status = 'pending'` so the row check-and-set is a
//! single statement; completion additionally wraps the status flip and
//! ticket inserts in one transaction.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{OrderItemRow, OrderRow};
use super::OrderStore;
use crate::domain::{CartItem, Order, OrderId, OrderPatch, OrderStatus, Ticket};
use crate::error::EngineError;

/// PostgreSQL-backed order ledger using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new ledger with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ledger_err(e: sqlx::Error) -> EngineError {
    EngineError::Ledger(e.to_string())
}

impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, order: &Order, items: &[CartItem]) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(ledger_err)?;

        sqlx::query(
            "INSERT INTO orders (id, buyer_id, event_id, session_id, status, subtotal, \
             discount_id, discount_code, discount_amount, total, payment_authorization_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id)
        .bind(order.event_id)
        .bind(&order.session_id)
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(&order.discount_id)
        .bind(&order.discount_code)
        .bind(order.discount_amount)
        .bind(order.total)
        .bind(&order.payment_authorization_id)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(ledger_err)?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, seat_id, tier_id, price) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id.as_uuid())
            .bind(&item.seat_id)
            .bind(&item.tier_id)
            .bind(item.price)
            .execute(&mut *tx)
            .await
            .map_err(ledger_err)?;
        }

        tx.commit().await.map_err(ledger_err)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, EngineError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, buyer_id, event_id, session_id, status, subtotal, discount_id, \
             discount_code, discount_amount, total, payment_authorization_id, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_err)?;

        row.map(Order::try_from).transpose()
    }

    async fn items_for_order(&self, id: OrderId) -> Result<Vec<CartItem>, EngineError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, seat_id, tier_id, price FROM order_items \
             WHERE order_id = $1 ORDER BY seat_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(ledger_err)?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn update_order_if_pending(
        &self,
        id: OrderId,
        patch: &OrderPatch,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "UPDATE orders SET \
             buyer_id = COALESCE($2, buyer_id), \
             session_id = COALESCE($3, session_id) \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .bind(patch.buyer_id)
        .bind(&patch.session_id)
        .execute(&self.pool)
        .await
        .map_err(ledger_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_discount_if_pending(
        &self,
        id: OrderId,
        discount_id: &str,
        code: &str,
        amount: Decimal,
        total: Decimal,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "UPDATE orders SET discount_id = $2, discount_code = $3, \
             discount_amount = $4, total = $5 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .bind(discount_id)
        .bind(code)
        .bind(amount)
        .bind(total)
        .execute(&self.pool)
        .await
        .map_err(ledger_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_payment_authorization(
        &self,
        id: OrderId,
        authorization_id: &str,
    ) -> Result<(), EngineError> {
        sqlx::query("UPDATE orders SET payment_authorization_id = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(authorization_id)
            .execute(&self.pool)
            .await
            .map_err(ledger_err)?;
        Ok(())
    }

    async fn transition_if_pending(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = 'pending'")
            .bind(id.as_uuid())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(ledger_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_order_if_pending(
        &self,
        id: OrderId,
        tickets: &[Ticket],
    ) -> Result<bool, EngineError> {
        let mut tx = self.pool.begin().await.map_err(ledger_err)?;

        let result =
            sqlx::query("UPDATE orders SET status = 'completed' WHERE id = $1 AND status = 'pending'")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(ledger_err)?;

        if result.rows_affected() != 1 {
            // Another transition already landed; nothing to roll back.
            return Ok(false);
        }

        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets (id, order_id, event_id, seat_id, tier_id, price, \
                 issued_at, checked_in) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(ticket.id)
            .bind(ticket.order_id.as_uuid())
            .bind(ticket.event_id)
            .bind(&ticket.seat_id)
            .bind(&ticket.tier_id)
            .bind(ticket.price)
            .bind(ticket.issued_at)
            .bind(ticket.checked_in)
            .execute(&mut *tx)
            .await
            .map_err(ledger_err)?;
        }

        tx.commit().await.map_err(ledger_err)?;
        Ok(true)
    }

    async fn seats_with_completed_order(
        &self,
        event_id: Uuid,
        seat_ids: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT t.seat_id FROM tickets t \
             JOIN orders o ON o.id = t.order_id \
             WHERE t.event_id = $1 AND o.status = 'completed' AND t.seat_id = ANY($2)",
        )
        .bind(event_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(ledger_err)?;

        Ok(rows.into_iter().map(|(seat_id,)| seat_id).collect())
    }
}
