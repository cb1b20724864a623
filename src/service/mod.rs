//! Service layer: the engine's business logic.
//!
//! [`discount_engine`] is the pure pricing calculation,
//! [`OrderService`] drives the order state machine over the lock store
//! and the ledger, and [`PaymentOrchestrator`] connects that state
//! machine to the payment provider.

pub mod discount_engine;
pub mod order_service;
pub mod payment;

pub use order_service::OrderService;
pub use payment::{PaymentOrchestrator, WebhookVerifier};
