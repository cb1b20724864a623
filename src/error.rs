//! Engine error types with HTTP status code mapping.
//!
//! [`EngineError`] is the central error type for the engine. Variants are
//! grouped into the four categories callers need to distinguish: conflicts
//! (retry with different input), not-found (terminal for the request),
//! dependency failures (retriable), and invariant violations (data or
//! programming errors, never retriable).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "seats unavailable: A-12",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`EngineError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Category of a webhook handling failure.
///
/// Each category carries a distinct public-safe message and status code;
/// the internal detail is only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookErrorKind {
    /// The engine is misconfigured (e.g. no webhook secret set).
    Configuration,
    /// The payload or signature failed verification.
    Validation,
    /// The event was verified but could not be applied.
    Processing,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                  |
/// |-----------|---------------------|------------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request              |
/// | 2000–2999 | State/Not Found     | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server/Dependency   | 500 / 502                    |
/// | 4000–4999 | Business rejection  | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// One or more seats are already held or sold.
    #[error("seats unavailable: {}", .0.join(", "))]
    SeatsUnavailable(Vec<String>),

    /// The order is not in the state the operation requires.
    #[error("cannot {operation} order {order_id}: status is {status}")]
    InvalidState {
        /// Order the operation targeted.
        order_id: uuid::Uuid,
        /// Status the order was actually in.
        status: String,
        /// The rejected operation, e.g. `"checkout"`.
        operation: &'static str,
    },

    /// A discount failed one of its preconditions for this cart.
    #[error("discount rejected: {0}")]
    DiscountRejected(String),

    /// Order with the given ID was not found.
    #[error("order not found: {0}")]
    OrderNotFound(uuid::Uuid),

    /// No discount exists for the given code.
    #[error("discount not found: {0}")]
    DiscountNotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A discount's parameters are malformed for its declared variant.
    ///
    /// This is a data error, not a rejection: callers must not retry.
    #[error("invalid discount rule: {0}")]
    InvalidDiscountRule(String),

    /// Seat-lock store communication failure.
    #[error("lock store error: {0}")]
    LockStore(String),

    /// Ledger (database) failure.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Payment provider communication failure.
    #[error("payment provider error: {0}")]
    PaymentProvider(String),

    /// Discount service communication failure.
    #[error("discount service error: {0}")]
    DiscountService(String),

    /// Webhook handling failure with a public-safe message.
    ///
    /// The `internal` detail is logged by the [`IntoResponse`] impl and
    /// must never be serialized into the response body.
    #[error("{public}")]
    Webhook {
        /// Failure category.
        kind: WebhookErrorKind,
        /// Public-safe message returned to the caller.
        public: String,
        /// Internal detail for logs only.
        internal: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Builds a configuration-category webhook error.
    #[must_use]
    pub fn webhook_configuration(internal: impl Into<String>) -> Self {
        Self::Webhook {
            kind: WebhookErrorKind::Configuration,
            public: "webhook handling unavailable".to_string(),
            internal: internal.into(),
        }
    }

    /// Builds a validation-category webhook error.
    #[must_use]
    pub fn webhook_validation(internal: impl Into<String>) -> Self {
        Self::Webhook {
            kind: WebhookErrorKind::Validation,
            public: "webhook payload could not be verified".to_string(),
            internal: internal.into(),
        }
    }

    /// Builds a processing-category webhook error.
    #[must_use]
    pub fn webhook_processing(internal: impl Into<String>) -> Self {
        Self::Webhook {
            kind: WebhookErrorKind::Processing,
            public: "webhook event could not be processed".to_string(),
            internal: internal.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::OrderNotFound(_) => 2001,
            Self::DiscountNotFound(_) => 2002,
            Self::SeatsUnavailable(_) => 2101,
            Self::InvalidState { .. } => 2102,
            Self::Internal(_) => 3000,
            Self::Ledger(_) => 3001,
            Self::InvalidDiscountRule(_) => 3002,
            Self::LockStore(_) => 3101,
            Self::PaymentProvider(_) => 3102,
            Self::DiscountService(_) => 3103,
            Self::DiscountRejected(_) => 4001,
            Self::Webhook { kind, .. } => match kind {
                WebhookErrorKind::Configuration => 3201,
                WebhookErrorKind::Validation => 1201,
                WebhookErrorKind::Processing => 4201,
            },
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) | Self::DiscountNotFound(_) => StatusCode::NOT_FOUND,
            Self::SeatsUnavailable(_) | Self::InvalidState { .. } => StatusCode::CONFLICT,
            Self::DiscountRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::LockStore(_) | Self::PaymentProvider(_) | Self::DiscountService(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Ledger(_) | Self::InvalidDiscountRule(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Webhook { kind, .. } => match kind {
                WebhookErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
                WebhookErrorKind::Validation => StatusCode::BAD_REQUEST,
                WebhookErrorKind::Processing => StatusCode::UNPROCESSABLE_ENTITY,
            },
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        if let Self::Webhook { kind, internal, .. } = &self {
            tracing::error!(?kind, internal, "webhook error");
        }
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
