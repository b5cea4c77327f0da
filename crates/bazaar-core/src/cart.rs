//! # Cart
//!
//! The persisted shopping cart and its mutations.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Client Action            Route                     Cart Change         │
//! │  ─────────────            ─────                     ───────────         │
//! │                                                                         │
//! │  Add / change items ─────► POST /cart/update ──────► upsert_lines()    │
//! │                                                                         │
//! │  Change quantity ────────► POST /cart/updatequantity ► set_quantity()  │
//! │                                                                         │
//! │  Remove item ────────────► DELETE /cart/remove-product ► remove_line() │
//! │                                                                         │
//! │  Clear ──────────────────► DELETE /cart/removeall ─► clear()           │
//! │                                                                         │
//! │  Every mutation is followed by a re-price (see `pricing`) and a        │
//! │  versioned write. The whole batch fails or succeeds together.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status State Machine
//! ```text
//!              order placed
//!   ┌────────┐ ───────────────► ┌───────────┐
//!   │ active │                  │ completed │
//!   └────────┘ ───────────────► ├───────────┤
//!              7 days idle      │ abandoned │
//!                               └───────────┘
//!   Terminal states never transition.
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::pricing::CartPricing;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Status
// =============================================================================

/// Lifecycle status of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CartStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
            CartStatus::Abandoned => "abandoned",
        }
    }

    /// Completed and abandoned carts are frozen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CartStatus::Active)
    }

    pub fn can_transition_to(&self, next: CartStatus) -> bool {
        matches!(
            (self, next),
            (CartStatus::Active, CartStatus::Completed) | (CartStatus::Active, CartStatus::Abandoned)
        )
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A customisation chosen for a line, e.g. `("Size", "Large")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineOption {
    pub title: String,
    pub value: String,
}

/// One entry of a `POST /cart/update` batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineUpdate {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub options: Vec<LineOption>,
}

/// An item in the cart.
///
/// `unit_price_cents` is a snapshot written by the last re-price; it is
/// never trusted as an input to pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub options: Vec<LineOption>,
}

impl CartLineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, options: Vec<LineOption>) -> Self {
        CartLineItem {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: 0,
            line_total_cents: 0,
            options,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's cart.
///
/// ## Invariants
/// - Lines are unique by `product_id`
/// - `1 <= quantity <= 999`, at most 100 lines
/// - `subtotal = Σ line totals`
/// - `total = subtotal + tax + delivery + platform − coupon discount`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub items: Vec<CartLineItem>,
    pub status: CartStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub platform_fee_cents: i64,
    pub coupon_discount_cents: i64,
    pub total_cents: i64,
    pub distance_meters: i64,
    pub duration_seconds: i64,
    pub address_id: Option<String>,
    pub coupon_id: Option<String>,
    /// Optimistic concurrency token, bumped on every write.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty active cart.
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            items: Vec::new(),
            status: CartStatus::Active,
            subtotal_cents: 0,
            tax_cents: 0,
            delivery_fee_cents: 0,
            platform_fee_cents: 0,
            coupon_discount_cents: 0,
            total_cents: 0,
            distance_meters: 0,
            duration_seconds: 0,
            address_id: None,
            coupon_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find_line(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    fn ensure_active(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidCartTransition {
                from: self.status.as_str().to_string(),
                to: CartStatus::Active.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Inserts or replaces lines from a batch update.
    ///
    /// An existing line takes the new quantity and options. Nothing is
    /// changed if any entry is rejected.
    pub fn upsert_lines(&mut self, updates: &[LineUpdate]) -> CoreResult<()> {
        self.ensure_active()?;

        let mut next = self.items.clone();
        for update in updates {
            if update.quantity > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: update.quantity,
                    max: MAX_ITEM_QUANTITY,
                });
            }

            match next.iter_mut().find(|i| i.product_id == update.product_id) {
                Some(line) => {
                    line.quantity = update.quantity;
                    line.options = update.options.clone();
                }
                None => {
                    if next.len() >= MAX_CART_ITEMS {
                        return Err(CoreError::CartTooLarge {
                            max: MAX_CART_ITEMS,
                        });
                    }
                    next.push(CartLineItem::new(
                        update.product_id.clone(),
                        update.quantity,
                        update.options.clone(),
                    ));
                }
            }
        }

        self.items = next;
        Ok(())
    }

    /// Sets the quantity of a line already in the cart.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.ensure_active()?;

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let line = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line by product id.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        self.ensure_active()?;

        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CoreError::LineNotInCart(product_id.to_string()));
        }
        Ok(())
    }

    /// Removes every line.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.items.clear();
        Ok(())
    }

    /// Moves the cart to `next`, refusing illegal transitions.
    pub fn transition(&mut self, next: CartStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidCartTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Whether an active cart has been idle longer than `ttl_days`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        self.status == CartStatus::Active && self.updated_at + Duration::days(ttl_days) < now
    }

    /// Writes a pricing result onto the cart.
    ///
    /// `pricing.lines` is produced from `self.items` in order, so the two
    /// are zipped by position.
    pub fn apply_pricing(
        &mut self,
        pricing: &CartPricing,
        address_id: Option<String>,
        coupon_id: Option<String>,
    ) {
        for (line, priced) in self.items.iter_mut().zip(pricing.lines.iter()) {
            debug_assert_eq!(line.product_id, priced.product_id);
            line.unit_price_cents = priced.unit_price.cents();
            line.line_total_cents = priced.line_total.cents();
        }

        self.subtotal_cents = pricing.subtotal.cents();
        self.tax_cents = pricing.tax.cents();
        self.delivery_fee_cents = pricing.delivery_fee.cents();
        self.platform_fee_cents = pricing.platform_fee.cents();
        self.coupon_discount_cents = pricing.coupon_discount.cents();
        self.total_cents = pricing.total.cents();
        self.distance_meters = pricing.distance_meters;
        self.duration_seconds = pricing.duration_seconds;
        self.address_id = address_id;
        self.coupon_id = coupon_id;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn update(product_id: &str, quantity: i64) -> LineUpdate {
        LineUpdate {
            product_id: product_id.to_string(),
            quantity,
            options: Vec::new(),
        }
    }

    #[test]
    fn test_upsert_adds_and_replaces() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.upsert_lines(&[update("p-1", 2), update("p-2", 1)]).unwrap();
        assert_eq!(cart.line_count(), 2);

        let mut with_option = update("p-1", 5);
        with_option.options.push(LineOption {
            title: "Spice".to_string(),
            value: "Hot".to_string(),
        });
        cart.upsert_lines(&[with_option]).unwrap();

        let line = cart.find_line("p-1").unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.options.len(), 1);
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_upsert_is_all_or_nothing() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.upsert_lines(&[update("p-1", 1)]).unwrap();

        let result = cart.upsert_lines(&[update("p-2", 1), update("p-3", 1000)]);
        assert!(matches!(result, Err(CoreError::QuantityTooLarge { .. })));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new("t-1", "u-1");
        let updates: Vec<_> = (0..MAX_CART_ITEMS)
            .map(|i| update(&format!("p-{i}"), 1))
            .collect();
        cart.upsert_lines(&updates).unwrap();

        let result = cart.upsert_lines(&[update("one-too-many", 1)]);
        assert!(matches!(result, Err(CoreError::CartTooLarge { .. })));
    }

    #[test]
    fn test_set_quantity_requires_existing_line() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.upsert_lines(&[update("p-1", 1)]).unwrap();

        cart.set_quantity("p-1", 3).unwrap();
        assert_eq!(cart.find_line("p-1").unwrap().quantity, 3);

        let result = cart.set_quantity("p-2", 3);
        assert!(matches!(result, Err(CoreError::LineNotInCart(_))));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.upsert_lines(&[update("p-1", 1)]).unwrap();

        cart.remove_line("p-1").unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            cart.remove_line("p-1"),
            Err(CoreError::LineNotInCart(_))
        ));
    }

    #[test]
    fn test_terminal_states_never_transition() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.transition(CartStatus::Completed).unwrap();

        assert!(cart.transition(CartStatus::Active).is_err());
        assert!(cart.transition(CartStatus::Abandoned).is_err());
        assert!(cart.upsert_lines(&[update("p-1", 1)]).is_err());

        let mut abandoned = Cart::new("t-1", "u-1");
        abandoned.transition(CartStatus::Abandoned).unwrap();
        assert!(abandoned.transition(CartStatus::Completed).is_err());
    }

    #[test]
    fn test_expiry() {
        let mut cart = Cart::new("t-1", "u-1");
        let now = Utc::now();
        cart.updated_at = now - Duration::days(8);
        assert!(cart.is_expired(now, 7));

        cart.updated_at = now - Duration::days(6);
        assert!(!cart.is_expired(now, 7));

        cart.updated_at = now - Duration::days(8);
        cart.status = CartStatus::Completed;
        assert!(!cart.is_expired(now, 7));
    }
}
