//! Payment provider client.
//!
//! The provider issues authorization objects (holds) against an order's
//! final price, keyed back to the order through metadata, and later
//! confirms or fails them asynchronously via signed webhooks.

use std::future::Future;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::OrderId;
use crate::error::EngineError;

/// Remote status of a payment authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// Created; waiting for the buyer to confirm.
    RequiresConfirmation,
    /// Confirmation submitted; provider is processing.
    Processing,
    /// Funds captured.
    Succeeded,
    /// Authorization cancelled or voided.
    Cancelled,
}

impl AuthorizationStatus {
    /// Terminal statuses cannot be reused for a new checkout attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled)
    }
}

/// An authorization object as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentAuthorization {
    /// Provider-side authorization identifier.
    pub id: String,
    /// Client secret the buyer-facing frontend uses to confirm.
    pub client_secret: String,
    /// Remote status.
    pub status: AuthorizationStatus,
}

/// Create/retrieve/cancel contract with the payment provider.
pub trait PaymentProvider: Send + Sync {
    /// Creates a new authorization for `amount` against `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PaymentProvider`] on communication failure.
    fn create_authorization(
        &self,
        order_id: OrderId,
        amount: Decimal,
        currency: &str,
    ) -> impl Future<Output = Result<PaymentAuthorization, EngineError>> + Send;

    /// Retrieves an existing authorization.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PaymentProvider`] on communication failure
    /// or when the authorization does not exist.
    fn retrieve_authorization(
        &self,
        authorization_id: &str,
    ) -> impl Future<Output = Result<PaymentAuthorization, EngineError>> + Send;

    /// Cancels an authorization remotely.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PaymentProvider`] on communication failure.
    fn cancel_authorization(
        &self,
        authorization_id: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// HTTP client for the payment provider's authorization API.
#[derive(Debug, Clone)]
pub struct HttpPaymentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentClient {
    /// Creates a client for the provider at `base_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

fn provider_err(context: &str, e: reqwest::Error) -> EngineError {
    EngineError::PaymentProvider(format!("{context}: {e}"))
}

impl PaymentProvider for HttpPaymentClient {
    async fn create_authorization(
        &self,
        order_id: OrderId,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentAuthorization, EngineError> {
        let url = format!("{}/authorizations", self.base_url);
        let body = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "metadata": { "order_id": order_id.to_string() },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_err("create authorization", e))?;

        if !response.status().is_success() {
            return Err(EngineError::PaymentProvider(format!(
                "create authorization returned {}",
                response.status()
            )));
        }

        response
            .json::<PaymentAuthorization>()
            .await
            .map_err(|e| provider_err("malformed authorization body", e))
    }

    async fn retrieve_authorization(
        &self,
        authorization_id: &str,
    ) -> Result<PaymentAuthorization, EngineError> {
        let url = format!("{}/authorizations/{authorization_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| provider_err("retrieve authorization", e))?;

        if !response.status().is_success() {
            return Err(EngineError::PaymentProvider(format!(
                "retrieve authorization returned {}",
                response.status()
            )));
        }

        response
            .json::<PaymentAuthorization>()
            .await
            .map_err(|e| provider_err("malformed authorization body", e))
    }

    async fn cancel_authorization(&self, authorization_id: &str) -> Result<(), EngineError> {
        let url = format!("{}/authorizations/{authorization_id}/cancel", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| provider_err("cancel authorization", e))?;

        if !response.status().is_success() {
            return Err(EngineError::PaymentProvider(format!(
                "cancel authorization returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(AuthorizationStatus::Succeeded.is_terminal());
        assert!(AuthorizationStatus::Cancelled.is_terminal());
        assert!(!AuthorizationStatus::RequiresConfirmation.is_terminal());
        assert!(!AuthorizationStatus::Processing.is_terminal());
    }

    #[test]
    fn status_deserializes_snake_case() {
        let status: Result<AuthorizationStatus, _> =
            serde_json::from_str("\"requires_confirmation\"");
        assert_eq!(status.ok(), Some(AuthorizationStatus::RequiresConfirmation));
    }
}
