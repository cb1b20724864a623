//! Payment handlers: authorization creation and the provider webhook.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CreatePaymentResponse, WebhookAck};
use crate::app_state::AppState;
use crate::domain::OrderId;
use crate::error::{EngineError, ErrorResponse};

/// Header carrying the webhook's HMAC-SHA256 signature in lowercase hex.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// `POST /orders/:id/payment` — Create (or reuse) a payment
/// authorization for a pending order.
///
/// # Errors
///
/// Returns [`EngineError::InvalidState`] when the order is not pending,
/// [`EngineError::PaymentProvider`] on provider failure.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment",
    tag = "Payments",
    summary = "Create a payment authorization",
    description = "Creates a provider authorization over the order total, or returns the existing one while it is still confirmable.",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Authorization ready for confirmation", body = CreatePaymentResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order is not pending", body = ErrorResponse),
        (status = 502, description = "Payment provider failure", body = ErrorResponse),
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let authorization = state.payments.create_payment(OrderId::from_uuid(id)).await?;
    Ok(Json(CreatePaymentResponse::from(authorization)))
}

/// `POST /webhooks/payment` — Signed payment confirmation from the
/// provider.
///
/// The signature is verified over the raw body, so this handler takes
/// [`Bytes`] rather than a typed JSON extractor.
///
/// # Errors
///
/// Returns [`EngineError::Webhook`] when verification or processing
/// fails.
#[utoipa::path(
    post,
    path = "/webhooks/payment",
    tag = "Payments",
    summary = "Payment provider webhook",
    description = "Applies a signed payment event: success completes the order, failure or cancellation cancels it and frees the seats.",
    request_body(content = String, content_type = "application/json", description = "Raw signed webhook payload"),
    responses(
        (status = 200, description = "Event applied or acknowledged", body = WebhookAck),
        (status = 400, description = "Signature verification failed", body = ErrorResponse),
        (status = 422, description = "Event could not be applied", body = ErrorResponse),
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, EngineError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.payments.handle_webhook(signature, &body).await?;
    Ok((StatusCode::OK, Json(WebhookAck { received: true })))
}

/// Payment routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/orders/{id}/payment", post(create_payment))
}

/// Webhook routes mounted at the root level (providers are configured
/// with the bare path).
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/payment", post(payment_webhook))
}
