//! # Negotiation
//!
//! Attempt-limited price bargaining for products listed in a negotiate
//! offer.
//!
//! ## Attempt Flow
//! ```text
//!  reference = previous attempt's price, or the list price
//!       │
//!       ▼
//!  proposed >= floor ?
//!       │ yes                              │ no
//!       ▼                                  ▼
//!  Accepted                            Rejected
//!  reference − success_bps             reference − failure_bps
//!       │                                  │
//!       └──────────► max(result, floor) ◄──┘
//! ```
//!
//! The latest resulting price overrides the list price in pricing while
//! the negotiate offer stays active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::offer::NegotiateTerms;

/// Whether the proposed amount met the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AttemptOutcome {
    Accepted,
    Rejected,
}

/// A recorded attempt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NegotiationAttempt {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub product_id: String,
    pub offer_id: String,
    /// 1-based, unique per user and product.
    pub attempt_no: u32,
    pub proposed_cents: i64,
    pub resulting_price_cents: i64,
    pub outcome: AttemptOutcome,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Outcome of evaluating one attempt, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AttemptResult {
    pub attempt_no: u32,
    pub outcome: AttemptOutcome,
    pub resulting_price: Money,
    pub remaining_attempts: u32,
}

/// Attempt cap for these terms.
pub fn max_attempts(terms: &NegotiateTerms, default_max: u32) -> u32 {
    terms.max_attempts.unwrap_or(default_max)
}

/// The price the latest attempt settled on.
///
/// `prior` may be in any order.
pub fn latest_price(prior: &[NegotiationAttempt]) -> Option<Money> {
    prior
        .iter()
        .max_by_key(|a| a.attempt_no)
        .map(|a| Money::from_cents(a.resulting_price_cents))
}

/// Evaluates one attempt for `product_id`.
///
/// `prior` holds this user's earlier attempts on the product.
pub fn evaluate_attempt(
    terms: &NegotiateTerms,
    product_id: &str,
    list_price: Money,
    proposed: Money,
    prior: &[NegotiationAttempt],
    default_max: u32,
) -> CoreResult<AttemptResult> {
    if !proposed.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let floor = terms
        .floor_price(product_id)
        .ok_or_else(|| CoreError::NotNegotiable(product_id.to_string()))?;

    let max = max_attempts(terms, default_max);
    let used = prior.iter().map(|a| a.attempt_no).max().unwrap_or(0);
    if used >= max {
        return Err(CoreError::NegotiationExhausted {
            product_id: product_id.to_string(),
            max,
        });
    }

    let reference = latest_price(prior).unwrap_or(list_price);
    let (outcome, bps) = if proposed >= floor {
        (AttemptOutcome::Accepted, terms.success_bps)
    } else {
        (AttemptOutcome::Rejected, terms.failure_bps)
    };
    // Never below the floor, never above the price we started from
    let resulting_price = reference
        .apply_percentage_discount(bps)
        .max(floor)
        .min(reference);

    let attempt_no = used + 1;
    Ok(AttemptResult {
        attempt_no,
        outcome,
        resulting_price,
        remaining_attempts: max - attempt_no,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
