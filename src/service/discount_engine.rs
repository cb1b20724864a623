//! Discount evaluation engine.
//!
//! Pure calculation: given a discount definition, a cart, and the session
//! it targets, decide whether the discount applies and compute the
//! monetary reduction. Rejections are outcomes, not errors — the only
//! error path is a discount whose parameters are malformed for its
//! declared variant.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{CartItem, Discount, DiscountOutcome, DiscountRule};
use crate::error::EngineError;

/// Evaluates `discount` against the cart.
///
/// Preconditions are checked in a fixed order and short-circuit on the
/// first failure, each with a human-readable reason. A `None` discount is
/// a valid "no discount requested" input and yields an invalid outcome
/// with a zero amount.
///
/// Whatever the variant computes, the final amount is clamped to the cart
/// subtotal: a discount can never make an order negative.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDiscountRule`] when the discount's
/// parameters are malformed (zero `buy_qty`, negative amounts, percent
/// outside `(0, 100]`).
pub fn evaluate(
    discount: Option<&Discount>,
    items: &[CartItem],
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<DiscountOutcome, EngineError> {
    let Some(discount) = discount else {
        return Ok(DiscountOutcome::rejected("no discount requested"));
    };

    validate_rule(&discount.rule)?;

    if !discount.active {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} is not active",
            discount.code
        )));
    }

    if now < discount.active_from {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} is not active yet",
            discount.code
        )));
    }
    if now > discount.expires_at {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} has expired",
            discount.code
        )));
    }

    // max_usage <= 0 means unlimited.
    if discount.max_usage > 0 && discount.current_usage >= discount.max_usage {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} has reached its usage limit",
            discount.code
        )));
    }

    if !discount.applicable_session_ids.is_empty()
        && !discount
            .applicable_session_ids
            .iter()
            .any(|s| s == session_id)
    {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} does not apply to this session",
            discount.code
        )));
    }

    let cart_subtotal: Decimal = items.iter().map(|i| i.price).sum();
    let applicable: Vec<&CartItem> = if discount.applicable_tiers.is_empty() {
        items.iter().collect()
    } else {
        items
            .iter()
            .filter(|i| discount.applicable_tiers.contains(&i.tier_id))
            .collect()
    };

    if !discount.applicable_tiers.is_empty() && applicable.is_empty() {
        return Ok(DiscountOutcome::rejected(format!(
            "discount {} does not apply to any item in the cart",
            discount.code
        )));
    }

    let applicable_subtotal: Decimal = applicable.iter().map(|i| i.price).sum();

    // Minimum spend applies to percentage and flat variants only, and is
    // checked against the full cart subtotal.
    let min_spend = match &discount.rule {
        DiscountRule::Percentage { min_spend, .. } | DiscountRule::FlatOff { min_spend, .. } => {
            *min_spend
        }
        DiscountRule::BuyNGetNFree { .. } => None,
    };
    if let Some(min) = min_spend
        && cart_subtotal < min
    {
        return Ok(DiscountOutcome::rejected(format!(
            "cart subtotal is below the {min} minimum for discount {}",
            discount.code
        )));
    }

    let amount = match &discount.rule {
        DiscountRule::FlatOff { amount, .. } => (*amount).min(applicable_subtotal),
        DiscountRule::Percentage {
            percent, max_cap, ..
        } => {
            let raw = applicable_subtotal * *percent / Decimal::from(100);
            match max_cap {
                Some(cap) => raw.min(*cap),
                None => raw,
            }
        }
        DiscountRule::BuyNGetNFree { buy_qty, get_qty } => {
            let buy = *buy_qty as usize;
            let get = *get_qty as usize;
            if applicable.len() < buy {
                return Ok(DiscountOutcome::rejected(format!(
                    "discount {} needs at least {buy} applicable items",
                    discount.code
                )));
            }
            // Cheapest items go free: this minimizes the reduction and
            // must be reproduced exactly.
            let mut prices: Vec<Decimal> = applicable.iter().map(|i| i.price).collect();
            prices.sort();
            let free_count = applicable.len().min((applicable.len() / buy) * get);
            prices.iter().take(free_count).copied().sum()
        }
    };

    let amount = amount.min(cart_subtotal).max(Decimal::ZERO);

    let mut tiers: Vec<String> = applicable.iter().map(|i| i.tier_id.clone()).collect();
    tiers.sort();
    tiers.dedup();

    Ok(DiscountOutcome::applied(amount, tiers))
}

fn validate_rule(rule: &DiscountRule) -> Result<(), EngineError> {
    match rule {
        DiscountRule::Percentage {
            percent, max_cap, ..
        } => {
            if *percent <= Decimal::ZERO || *percent > Decimal::from(100) {
                return Err(EngineError::InvalidDiscountRule(format!(
                    "percent {percent} outside (0, 100]"
                )));
            }
            if let Some(cap) = max_cap
                && *cap < Decimal::ZERO
            {
                return Err(EngineError::InvalidDiscountRule(format!(
                    "negative max_cap {cap}"
                )));
            }
            Ok(())
        }
        DiscountRule::FlatOff { amount, .. } => {
            if *amount < Decimal::ZERO {
                return Err(EngineError::InvalidDiscountRule(format!(
                    "negative flat amount {amount}"
                )));
            }
            Ok(())
        }
        DiscountRule::BuyNGetNFree { buy_qty, .. } => {
            if *buy_qty == 0 {
                return Err(EngineError::InvalidDiscountRule(
                    "buy_qty must be positive".to_string(),
                ));
            }
            Ok(())
        }
    }
}
