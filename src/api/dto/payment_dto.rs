//! Payment-related DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::clients::{AuthorizationStatus, PaymentAuthorization};

/// Response body for `POST /orders/{id}/payment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePaymentResponse {
    /// Provider-side authorization identifier.
    pub authorization_id: String,
    /// Client secret the buyer-facing frontend uses to confirm.
    pub client_secret: String,
    /// Remote authorization status.
    pub status: String,
}

impl From<PaymentAuthorization> for CreatePaymentResponse {
    fn from(authorization: PaymentAuthorization) -> Self {
        let status = match authorization.status {
            AuthorizationStatus::RequiresConfirmation => "requires_confirmation",
            AuthorizationStatus::Processing => "processing",
            AuthorizationStatus::Succeeded => "succeeded",
            AuthorizationStatus::Cancelled => "cancelled",
        };
        Self {
            authorization_id: authorization.id,
            client_secret: authorization.client_secret,
            status: status.to_string(),
        }
    }
}

/// Acknowledgement body for `POST /webhooks/payment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `true` when the delivery was accepted.
    pub received: bool,
}
