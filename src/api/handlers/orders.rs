//! Order lifecycle handlers: place, get, patch, promo, checkout, cancel,
//! and the seat-availability probe.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApplyPromoRequest, AvailabilityParams, AvailabilityResponse, OrderResponse, PlaceOrderRequest,
    UpdateOrderRequest,
};
use crate::app_state::AppState;
use crate::domain::{CartItem, OrderId, OrderPatch};
use crate::error::{EngineError, ErrorResponse};

/// `POST /orders` — Place a new order, locking every requested seat.
///
/// # Errors
///
/// Returns [`EngineError`] on an invalid cart or a seat conflict.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    summary = "Place an order",
    description = "Atomically locks every seat in the cart and writes a pending order. Fails with 409 when any seat is already held or sold.",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid cart", body = ErrorResponse),
        (status = 409, description = "Seats unavailable", body = ErrorResponse),
    )
)]
pub async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let items: Vec<CartItem> = req.items.into_iter().map(CartItem::from).collect();
    let order = state
        .orders
        .place_order(req.buyer_id, req.event_id, req.session_id, items)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// `GET /orders/:id` — Fetch an order.
///
/// # Errors
///
/// Returns [`EngineError::OrderNotFound`] if the order does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Get an order",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order details", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let order = state.orders.get_order(OrderId::from_uuid(id)).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// `PATCH /orders/:id` — Patch a pending order's buyer or session.
///
/// # Errors
///
/// Returns [`EngineError::InvalidState`] when the order is no longer
/// pending.
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Update a pending order",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order is not pending", body = ErrorResponse),
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let patch = OrderPatch {
        buyer_id: req.buyer_id,
        session_id: req.session_id,
    };
    let order = state
        .orders
        .update_order(OrderId::from_uuid(id), patch)
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// `DELETE /orders/:id` — Cancel a pending order and free its seats.
///
/// # Errors
///
/// Returns [`EngineError::InvalidState`] when the order is no longer
/// pending.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Cancel a pending order",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Cancelled order", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order is not pending", body = ErrorResponse),
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let order = state.orders.cancel_order(OrderId::from_uuid(id)).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// `POST /orders/:id/promo` — Apply a promo code to a pending order.
///
/// # Errors
///
/// Returns [`EngineError::DiscountNotFound`] or
/// [`EngineError::DiscountRejected`] on a bad or inapplicable code.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/promo",
    tag = "Orders",
    summary = "Apply a promo code",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    request_body = ApplyPromoRequest,
    responses(
        (status = 200, description = "Order with the discount applied", body = OrderResponse),
        (status = 404, description = "Order or promo code not found", body = ErrorResponse),
        (status = 422, description = "Discount rejected", body = ErrorResponse),
    )
)]
pub async fn apply_promo(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ApplyPromoRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let order = state
        .orders
        .apply_promo_code(OrderId::from_uuid(id), &req.code)
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// `POST /orders/:id/checkout` — Finalize a pending order and issue its
/// tickets.
///
/// # Errors
///
/// Returns [`EngineError::InvalidState`] when the order is no longer
/// pending.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/checkout",
    tag = "Orders",
    summary = "Checkout an order",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Completed order", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order is not pending", body = ErrorResponse),
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let order = state.orders.checkout(OrderId::from_uuid(id)).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// `GET /availability` — Read-only probe of the seat-lock store.
///
/// # Errors
///
/// Returns [`EngineError::LockStore`] on store communication failure.
#[utoipa::path(
    get,
    path = "/api/v1/availability",
    tag = "Orders",
    summary = "Probe seat availability",
    description = "Returns which of the requested seats are currently locked. Does not reserve anything.",
    params(AvailabilityParams),
    responses(
        (status = 200, description = "Availability snapshot", body = AvailabilityResponse),
        (status = 400, description = "No seats requested", body = ErrorResponse),
    )
)]
pub async fn availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Result<impl IntoResponse, EngineError> {
    let seat_ids = params.seat_ids();
    if seat_ids.is_empty() {
        return Err(EngineError::InvalidRequest(
            "no seats requested".to_string(),
        ));
    }
    let snapshot = state.orders.availability(&seat_ids).await?;
    Ok(Json(AvailabilityResponse {
        all_available: snapshot.all_available,
        unavailable: snapshot.unavailable,
    }))
}

/// Order lifecycle routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(place_order))
        .route(
            "/orders/{id}",
            get(get_order).patch(update_order).delete(cancel_order),
        )
        .route("/orders/{id}/promo", post(apply_promo))
        .route("/orders/{id}/checkout", post(checkout))
        .route("/availability", get(availability))
}
