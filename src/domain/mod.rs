//! Domain layer: order identity, ledger types, discounts, and events.
//!
//! This module contains the engine's domain model: the order and ticket
//! ledger types, discount value objects, the lifecycle event enum, and
//! the broadcast bus that carries those events to outbound consumers.

pub mod discount;
pub mod event_bus;
pub mod order;
pub mod order_event;
pub mod order_id;

pub use discount::{Discount, DiscountOutcome, DiscountRule};
pub use event_bus::EventBus;
pub use order::{CartItem, Order, OrderPatch, OrderStatus, Ticket};
pub use order_event::OrderEvent;
pub use order_id::OrderId;
