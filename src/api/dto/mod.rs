//! Data-transfer objects for the REST API.

pub mod order_dto;
pub mod payment_dto;

pub use order_dto::{
    ApplyPromoRequest, AvailabilityParams, AvailabilityResponse, CartItemDto, OrderResponse,
    PlaceOrderRequest, UpdateOrderRequest,
};
pub use payment_dto::{CreatePaymentResponse, WebhookAck};
