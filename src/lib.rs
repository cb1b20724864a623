//! # boxoffice
//!
//! Seat-reservation and checkout engine for event ticketing.
//!
//! The engine turns a cart of seats into a completed order through an
//! atomic multi-seat lock, an optional promo-code discount, and a
//! provider-backed payment authorization confirmed by signed webhooks.
//! Orders follow a strict `pending → completed | cancelled` state
//! machine; every failure path releases the seats it held.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                 Payment provider (webhooks)
//!     │                                │
//!     ├── REST Handlers (api/) ────────┘
//!     │
//!     ├── OrderService (service/)
//!     ├── PaymentOrchestrator (service/)
//!     ├── DiscountEngine (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── SeatLockStore ── Redis (locking/)
//!     ├── OrderStore ───── PostgreSQL (persistence/)
//!     │
//!     └── External clients ── payment + discount services (clients/)
//! ```

pub mod api;
pub mod app_state;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod locking;
pub mod persistence;
pub mod service;
