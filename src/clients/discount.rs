//! Discount service client.
//!
//! The discount service owns discount definitions and usage counters; the
//! engine only fetches definitions by code and reports usage. Calls are
//! authenticated with a bearer token obtained out-of-band.

use std::future::Future;

use crate::domain::Discount;
use crate::error::EngineError;

/// Read/report contract with the discount service.
pub trait DiscountProvider: Send + Sync {
    /// Fetches a discount definition by its public promo code.
    ///
    /// `Ok(None)` means no such code exists — that is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DiscountService`] on communication failure.
    fn fetch_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Discount>, EngineError>> + Send;

    /// Increments the usage counter of a discount.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DiscountService`] on communication failure.
    fn increment_usage(&self, id: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// HTTP client for the discount service.
#[derive(Debug, Clone)]
pub struct HttpDiscountClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl HttpDiscountClient {
    /// Creates a client for the service at `base_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: String, bearer_token: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        }
    }
}

impl DiscountProvider for HttpDiscountClient {
    async fn fetch_by_code(&self, code: &str) -> Result<Option<Discount>, EngineError> {
        let url = format!("{}/discounts/by-code/{code}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| EngineError::DiscountService(format!("fetch failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EngineError::DiscountService(format!(
                "fetch returned {}",
                response.status()
            )));
        }

        let discount = response
            .json::<Discount>()
            .await
            .map_err(|e| EngineError::DiscountService(format!("malformed discount body: {e}")))?;
        Ok(Some(discount))
    }

    async fn increment_usage(&self, id: &str) -> Result<(), EngineError> {
        let url = format!("{}/discounts/{id}/usage", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| EngineError::DiscountService(format!("usage increment failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::DiscountService(format!(
                "usage increment returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
