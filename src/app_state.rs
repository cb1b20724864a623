//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::clients::{HttpDiscountClient, HttpPaymentClient};
use crate::domain::EventBus;
use crate::locking::RedisSeatLockStore;
use crate::persistence::PostgresOrderStore;
use crate::service::{OrderService, PaymentOrchestrator};

/// The order service wired to its production collaborators.
pub type LiveOrderService =
    OrderService<RedisSeatLockStore, PostgresOrderStore, HttpDiscountClient>;

/// The payment orchestrator wired to its production collaborators.
pub type LivePaymentOrchestrator = PaymentOrchestrator<
    RedisSeatLockStore,
    PostgresOrderStore,
    HttpDiscountClient,
    HttpPaymentClient,
>;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Order lifecycle service.
    pub orders: Arc<LiveOrderService>,
    /// Payment orchestration and webhook handling.
    pub payments: Arc<LivePaymentOrchestrator>,
    /// Event bus for outbound consumers.
    pub event_bus: EventBus,
}
