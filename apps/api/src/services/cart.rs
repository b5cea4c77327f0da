//! # Cart Service
//!
//! Every cart read and write funnels through [`reprice`], so stored totals
//! always reflect live product prices, negotiated overrides, the delivery
//! route and the coupon.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load active cart (expired → abandoned, fresh cart)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate lines (bazaar-core, all-or-nothing)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reprice                                                               │
//! │   ├── products.get_many + negotiations.active_overrides → quote_lines  │
//! │   ├── address → DistanceProvider::route   (unknown address → no fee)   │
//! │   ├── coupon  → CouponPolicy decides what an unusable coupon does      │
//! │   └── PricingEngine::price → Cart::apply_pricing                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  carts.save (version check, 409 on a lost race)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, warn};

use bazaar_core::pricing::quote_lines;
use bazaar_core::{
    Cart, CartPricing, CoreError, CoreResult, Coupon, LineQuote, PricingInput, RouteEstimate,
};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// What to do with a coupon that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponPolicy {
    /// The caller asked for this coupon: unknown, inactive or out-of-range
    /// coupons fail the request.
    Require,
    /// The coupon was carried over from an earlier request: drop it and
    /// price without a discount.
    DropIfInvalid,
}

/// A cart after re-pricing, with the inputs that were actually used.
#[derive(Debug, Clone)]
pub struct Repriced {
    pub pricing: CartPricing,
    pub route: Option<RouteEstimate>,
    pub coupon: Option<Coupon>,
}

impl Repriced {
    pub fn delivery_minutes(&self) -> i64 {
        self.route.map(|r| r.duration_minutes()).unwrap_or(0)
    }
}

/// Recomputes every derived field of `cart`.
///
/// Nothing is persisted; callers save the cart afterwards.
///
/// ## Errors
/// - `ProductNotFound` when a line's product is missing or deleted
/// - `CouponNotFound` / `CouponInactive` / `CouponNotApplicable` under
///   [`CouponPolicy::Require`]
/// - 502 when the distance provider fails
pub async fn reprice(
    state: &AppState,
    cart: &mut Cart,
    address_id: Option<String>,
    coupon_id: Option<String>,
    policy: CouponPolicy,
) -> ApiResult<Repriced> {
    if cart.is_empty() {
        let pricing = CartPricing::default();
        cart.apply_pricing(&pricing, address_id, None);
        return Ok(Repriced {
            pricing,
            route: None,
            coupon: None,
        });
    }

    let tenant_id = cart.tenant_id.clone();
    let user_id = cart.user_id.clone();

    let ids: Vec<String> = cart.items.iter().map(|i| i.product_id.clone()).collect();
    let products = state.db.products().get_many(&tenant_id, &ids).await?;
    let overrides = state
        .db
        .negotiations()
        .active_overrides(&tenant_id, &user_id)
        .await?;
    let lines = quote_lines(&cart.items, &products, &overrides)?;

    let (address_id, route) = match address_id {
        Some(id) => match state.db.addresses().get(&tenant_id, &user_id, &id).await? {
            Some(address) => {
                let route = state
                    .distance
                    .route(state.config.store_location, address.location())
                    .await?;
                (Some(id), Some(route))
            }
            None => {
                warn!(address_id = %id, cart_id = %cart.id, "Address not found, pricing without delivery");
                (None, None)
            }
        },
        None => (None, None),
    };

    let mut coupon = match coupon_id {
        Some(id) => match state.db.coupons().get(&tenant_id, &id).await? {
            Some(coupon) => Some(coupon),
            None if policy == CouponPolicy::Require => {
                return Err(CoreError::CouponNotFound(id).into());
            }
            None => {
                warn!(coupon_id = %id, cart_id = %cart.id, "Dropping unknown coupon");
                None
            }
        },
        None => None,
    };

    let pricing = match price(state, &lines, route, coupon.as_ref()) {
        Ok(pricing) => pricing,
        Err(CoreError::CouponInactive(code)) | Err(CoreError::CouponNotApplicable { code, .. })
            if policy == CouponPolicy::DropIfInvalid =>
        {
            warn!(coupon = %code, cart_id = %cart.id, "Dropping coupon that no longer applies");
            coupon = None;
            price(state, &lines, route, None)?
        }
        Err(e) => return Err(e.into()),
    };

    debug!(
        cart_id = %cart.id,
        subtotal = pricing.subtotal.cents(),
        total = pricing.total.cents(),
        "Cart repriced"
    );

    cart.apply_pricing(&pricing, address_id, coupon.as_ref().map(|c| c.id.clone()));
    Ok(Repriced {
        pricing,
        route,
        coupon,
    })
}

fn price(
    state: &AppState,
    lines: &[LineQuote],
    route: Option<RouteEstimate>,
    coupon: Option<&Coupon>,
) -> CoreResult<CartPricing> {
    state.pricing.price(&PricingInput {
        lines: lines.to_vec(),
        route,
        coupon,
    })
}

/// The caller's active cart. An expired cart is abandoned and `None`
/// returned.
pub async fn load_active(state: &AppState, user: &AuthUser) -> ApiResult<Option<Cart>> {
    let cart = state
        .db
        .carts()
        .load_active(&user.tenant_id, &user.user_id, state.config.cart_ttl_days, Utc::now())
        .await?;
    Ok(cart)
}

/// Applies `change` to the caller's active cart, re-prices and saves it.
///
/// The cart keeps its address and coupon; a coupon that stopped applying
/// is dropped.
pub async fn mutate<F>(state: &AppState, user: &AuthUser, change: F) -> ApiResult<(Cart, Repriced)>
where
    F: FnOnce(&mut Cart) -> CoreResult<()> + Send,
{
    let mut cart = state
        .db
        .carts()
        .get_or_create_active(&user.tenant_id, &user.user_id, state.config.cart_ttl_days)
        .await?;

    change(&mut cart)?;

    let address_id = cart.address_id.clone();
    let coupon_id = cart.coupon_id.clone();
    let repriced = reprice(state, &mut cart, address_id, coupon_id, CouponPolicy::DropIfInvalid).await?;

    let saved = state.db.carts().save(&cart).await?;
    Ok((saved, repriced))
}
