//! # Pricing Engine
//!
//! Recomputes every derived amount of a cart from live inputs.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines (live price or negotiated override, GST)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  line total = unit × qty ──► subtotal = Σ line totals                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tax = round(Σ line total × gst_bps / 10000)   (rounded once)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  delivery = ceil_rupee((metres − free metres) × rate / 1000)           │
//! │             zero when subtotal ≥ free-delivery threshold               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  gross = subtotal + tax + delivery + platform fee                      │
//! │  total = gross − coupon % of gross                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never reads the clock or storage: the same input always
//! yields the same [`CartPricing`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLineItem;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Coupon, Product, RouteEstimate, TaxRate};

// =============================================================================
// Configuration
// =============================================================================

/// Fee settings shared by every cart of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    pub platform_fee: Money,
    pub delivery_rate_cents_per_km: i64,
    pub free_distance_meters: i64,
    /// `None` disables free delivery.
    pub free_delivery_threshold: Option<Money>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            platform_fee: Money::from_cents(500),
            delivery_rate_cents_per_km: 1000,
            free_distance_meters: 0,
            free_delivery_threshold: None,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A cart line resolved against the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineQuote {
    pub product_id: String,
    pub quantity: i64,
    pub list_price: Money,
    pub gst: TaxRate,
    pub negotiated_price: Option<Money>,
}

impl LineQuote {
    /// The price actually charged per unit.
    pub fn unit_price(&self) -> Money {
        self.negotiated_price.unwrap_or(self.list_price)
    }
}

/// Resolves cart lines against live products and negotiated overrides.
///
/// A missing or deleted product fails the whole quote. Disabled products
/// are still priced so existing carts keep working.
pub fn quote_lines(
    items: &[CartLineItem],
    products: &HashMap<String, Product>,
    negotiated: &HashMap<String, Money>,
) -> CoreResult<Vec<LineQuote>> {
    items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.product_id)
                .filter(|p| !p.is_deleted)
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            Ok(LineQuote {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                list_price: product.price(),
                gst: product.gst(),
                negotiated_price: negotiated.get(&item.product_id).copied(),
            })
        })
        .collect()
}

/// Everything the engine needs for one computation.
#[derive(Debug, Clone, Default)]
pub struct PricingInput<'a> {
    pub lines: Vec<LineQuote>,
    /// Route to the delivery address; `None` when no address is applied.
    pub route: Option<RouteEstimate>,
    pub coupon: Option<&'a Coupon>,
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub negotiated: bool,
}

/// Computed cart amounts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartPricing {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub platform_fee: Money,
    pub coupon_discount: Money,
    pub total: Money,
    pub distance_meters: i64,
    pub duration_seconds: i64,
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        PricingEngine { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Delivery fee for `route` given the cart subtotal.
    pub fn delivery_fee(&self, route: Option<&RouteEstimate>, subtotal: Money) -> Money {
        let Some(route) = route else {
            return Money::zero();
        };

        if let Some(threshold) = self.config.free_delivery_threshold {
            if subtotal >= threshold {
                return Money::zero();
            }
        }

        let chargeable_m = (route.distance_meters - self.config.free_distance_meters).max(0);
        let numerator = chargeable_m * self.config.delivery_rate_cents_per_km;
        let cents = (numerator + 999) / 1000;
        Money::from_cents(cents).ceil_to_major()
    }

    /// Prices a cart.
    ///
    /// ## Errors
    /// - `AmountOverflow` when a line or total leaves the `i64` range
    /// - `CouponInactive` / `CouponNotApplicable` when a coupon is supplied
    ///   but cannot be used on this total
    pub fn price(&self, input: &PricingInput<'_>) -> CoreResult<CartPricing> {
        if input.lines.is_empty() {
            return Ok(CartPricing::default());
        }

        let lines = input
            .lines
            .iter()
            .map(|quote| {
                let unit_price = quote.unit_price();
                let line_total = unit_price
                    .checked_multiply_quantity(quote.quantity)
                    .ok_or(CoreError::AmountOverflow)?;
                Ok(PricedLine {
                    product_id: quote.product_id.clone(),
                    quantity: quote.quantity,
                    unit_price,
                    line_total,
                    negotiated: quote.negotiated_price.is_some(),
                })
            })
            .collect::<CoreResult<Vec<PricedLine>>>()?;

        let subtotal = checked_sum(lines.iter().map(|l| l.line_total))?;

        let tax_numerator: i128 = lines
            .iter()
            .zip(input.lines.iter())
            .map(|(line, quote)| line.line_total.cents() as i128 * quote.gst.bps() as i128)
            .sum();
        let tax = Money::from_bps_numerator(tax_numerator);

        let delivery_fee = self.delivery_fee(input.route.as_ref(), subtotal);
        let platform_fee = self.config.platform_fee;
        let gross = checked_sum([subtotal, tax, delivery_fee, platform_fee])?;

        let coupon_discount = match input.coupon {
            Some(coupon) => {
                if !coupon.active {
                    return Err(CoreError::CouponInactive(coupon.code.clone()));
                }
                if !coupon.applies_to(gross) {
                    return Err(CoreError::CouponNotApplicable {
                        code: coupon.code.clone(),
                        min_cents: coupon.min_price_cents,
                        max_cents: coupon.max_price_cents,
                        total_cents: gross.cents(),
                    });
                }
                coupon.discount_on(gross)
            }
            None => Money::zero(),
        };

        let route = input.route.unwrap_or_default();
        Ok(CartPricing {
            lines,
            subtotal,
            tax,
            delivery_fee,
            platform_fee,
            coupon_discount,
            total: (gross - coupon_discount).non_negative(),
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
        })
    }
}

fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> CoreResult<Money> {
    amounts
        .into_iter()
        .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
        .ok_or(CoreError::AmountOverflow)
}

// =============================================================================
// Unit Tests
// =============================================================================
