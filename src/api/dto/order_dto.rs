//! Order-related DTOs for placement, patching, promos, and availability.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{CartItem, Order};

/// One seat in a placement request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartItemDto {
    /// Venue seat identifier (e.g. `"A-12"`).
    pub seat_id: String,
    /// Pricing tier identifier (e.g. `"vip"`).
    pub tier_id: String,
    /// Tier price at cart-assembly time.
    pub price: Decimal,
}

impl From<CartItemDto> for CartItem {
    fn from(dto: CartItemDto) -> Self {
        Self {
            seat_id: dto.seat_id,
            tier_id: dto.tier_id,
            price: dto.price,
        }
    }
}

/// Request body for `POST /orders`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Buyer identifier.
    pub buyer_id: Uuid,
    /// Event identifier.
    pub event_id: Uuid,
    /// Session (showtime) identifier within the event.
    pub session_id: String,
    /// Seats to reserve.
    pub items: Vec<CartItemDto>,
}

/// Request body for `PATCH /orders/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    /// Transfer the order to a different buyer.
    #[serde(default)]
    pub buyer_id: Option<Uuid>,
    /// Move the order to a different session of the same event.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for `POST /orders/{id}/promo`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyPromoRequest {
    /// The promo code to apply.
    pub code: String,
}

/// Order representation returned by every order endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    /// Order identifier.
    pub id: Uuid,
    /// Buyer identifier.
    pub buyer_id: Uuid,
    /// Event identifier.
    pub event_id: Uuid,
    /// Session identifier.
    pub session_id: String,
    /// Lifecycle status: `pending`, `completed`, or `cancelled`.
    pub status: String,
    /// Pre-discount subtotal.
    pub subtotal: Decimal,
    /// Applied promo code, if any.
    pub discount_code: Option<String>,
    /// Monetary reduction.
    pub discount_amount: Decimal,
    /// Final price.
    pub total: Decimal,
    /// External payment-authorization identifier, once one exists.
    pub payment_authorization_id: Option<String>,
    /// Ledger creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: *order.id.as_uuid(),
            buyer_id: order.buyer_id,
            event_id: order.event_id,
            session_id: order.session_id,
            status: order.status.to_string(),
            subtotal: order.subtotal,
            discount_code: order.discount_code,
            discount_amount: order.discount_amount,
            total: order.total,
            payment_authorization_id: order.payment_authorization_id,
            created_at: order.created_at,
        }
    }
}

/// Query parameters for `GET /availability`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityParams {
    /// Comma-separated seat identifiers, e.g. `A-1,A-2,B-7`.
    pub seats: String,
}

impl AvailabilityParams {
    /// Splits the comma-separated list into trimmed, non-empty seat ids.
    #[must_use]
    pub fn seat_ids(&self) -> Vec<String> {
        self.seats
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Response body for `GET /availability`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// `true` when every probed seat is free.
    pub all_available: bool,
    /// The seats currently held by some order.
    pub unavailable: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_list_parsing_skips_blanks() {
        let params = AvailabilityParams {
            seats: "A-1, A-2,,B-7 ".to_string(),
        };
        assert_eq!(params.seat_ids(), vec!["A-1", "A-2", "B-7"]);
    }
}
