//! Clients for external collaborators: the discount service and the
//! payment provider.
//!
//! Both are expressed as traits so the service layer can be exercised
//! against in-process fakes; the HTTP implementations use `reqwest`.

pub mod discount;
pub mod payment;

pub use discount::{DiscountProvider, HttpDiscountClient};
pub use payment::{AuthorizationStatus, HttpPaymentClient, PaymentAuthorization, PaymentProvider};
