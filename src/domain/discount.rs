//! Discount value objects.
//!
//! Discounts are owned by an external service; the engine treats each
//! fetched [`Discount`] as an immutable value object for the duration of
//! one evaluation. Usage-counter increments go back through the service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameter variant of a discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountRule {
    /// Percentage off the applicable subtotal, optionally capped.
    Percentage {
        /// Percent in `(0, 100]`.
        percent: Decimal,
        /// Absolute cap on the computed reduction.
        #[serde(default)]
        max_cap: Option<Decimal>,
        /// Minimum cart subtotal required.
        #[serde(default)]
        min_spend: Option<Decimal>,
    },

    /// Fixed amount off the applicable subtotal.
    FlatOff {
        /// Reduction amount.
        amount: Decimal,
        /// Minimum cart subtotal required.
        #[serde(default)]
        min_spend: Option<Decimal>,
    },

    /// Buy `buy_qty` applicable items, get `get_qty` cheapest ones free.
    BuyNGetNFree {
        /// Items that must be purchased per free batch.
        buy_qty: u32,
        /// Items given free per batch.
        get_qty: u32,
    },
}

/// A discount definition fetched from the discount service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    /// Service-side discount identifier.
    pub id: String,
    /// Public promo code.
    pub code: String,
    /// Parameter variant.
    pub rule: DiscountRule,
    /// Whether the discount is switched on at all.
    pub active: bool,
    /// Start of the validity window (inclusive).
    pub active_from: DateTime<Utc>,
    /// End of the validity window (inclusive).
    pub expires_at: DateTime<Utc>,
    /// Usage cap; zero or negative means unlimited.
    #[serde(default)]
    pub max_usage: i64,
    /// Times the discount has been used so far.
    #[serde(default)]
    pub current_usage: i64,
    /// Tier restriction; empty means all tiers are applicable.
    #[serde(default)]
    pub applicable_tiers: Vec<String>,
    /// Session restriction; empty means all sessions are applicable.
    #[serde(default)]
    pub applicable_session_ids: Vec<String>,
}

/// Result of evaluating a discount against a cart.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountOutcome {
    /// Whether the discount applies to this cart.
    pub valid: bool,
    /// Monetary reduction; zero when invalid.
    pub amount: Decimal,
    /// Human-readable rejection reason; empty when valid.
    pub reason: String,
    /// Tiers the reduction was computed over.
    pub applicable_tiers: Vec<String>,
}

impl DiscountOutcome {
    /// Builds a rejection outcome with the given reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            amount: Decimal::ZERO,
            reason: reason.into(),
            applicable_tiers: Vec::new(),
        }
    }

    /// Builds a successful outcome.
    #[must_use]
    pub fn applied(amount: Decimal, applicable_tiers: Vec<String>) -> Self {
        Self {
            valid: true,
            amount,
            reason: String::new(),
            applicable_tiers,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn rule_serde_uses_type_tag() {
        let rule = DiscountRule::FlatOff {
            amount: Decimal::from(20),
            min_spend: None,
        };
        let json = serde_json::to_string(&rule).unwrap_or_default();
        assert!(json.contains("\"type\":\"flat_off\""));

        let parsed: DiscountRule =
            serde_json::from_str("{\"type\":\"buy_n_get_n_free\",\"buy_qty\":2,\"get_qty\":1}")
                .ok()
                .unwrap_or_else(|| panic!("deserialization failed"));
        assert_eq!(
            parsed,
            DiscountRule::BuyNGetNFree {
                buy_qty: 2,
                get_qty: 1
            }
        );
    }

    #[test]
    fn discount_defaults_for_optional_fields() {
        let json = r#"{
            "id": "d1",
            "code": "SUMMER",
            "rule": {"type": "percentage", "percent": "10"},
            "active": true,
            "active_from": "2026-01-01T00:00:00Z",
            "expires_at": "2026-12-31T23:59:59Z"
        }"#;
        let discount: Discount = serde_json::from_str(json)
            .ok()
            .unwrap_or_else(|| panic!("deserialization failed"));
        assert_eq!(discount.max_usage, 0);
        assert!(discount.applicable_tiers.is_empty());
        assert!(discount.applicable_session_ids.is_empty());
    }
}
