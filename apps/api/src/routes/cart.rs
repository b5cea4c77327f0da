//! Cart endpoints.
//!
//! Every mutation re-prices and saves the cart in the same request and
//! answers with the updated cart.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use bazaar_core::validation::{validate_id, validate_line_updates, validate_quantity};
use bazaar_core::{Cart, CoreError, Coupon, LineUpdate, Money};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{ok, Envelope};
use crate::services::cart::{self as cart_service, CouponPolicy};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/update", post(update_items))
        .route("/updatequantity", post(update_quantity))
        .route("/remove-product/{product_id}", delete(remove_product))
        .route("/removeall", delete(remove_all))
        .route("/count", get(count))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub address_id: Option<String>,
    pub coupon_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemsRequest {
    pub items: Vec<LineUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart: Cart,
    /// Coupons usable on the cart's pre-coupon total.
    pub coupons: Vec<Coupon>,
    pub delivery_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

async fn applicable_coupons(state: &AppState, cart: &Cart) -> ApiResult<Vec<Coupon>> {
    if cart.is_empty() {
        return Ok(Vec::new());
    }
    let gross = Money::from_cents(cart.total_cents + cart.coupon_discount_cents);
    Ok(state.db.coupons().list_applicable(&cart.tenant_id, gross).await?)
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /cart?addressId&couponId`
///
/// Query values replace the cart's stored address and coupon. A coupon
/// named in the query must apply; a stored one is dropped if it no longer
/// does.
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<CartQuery>,
) -> ApiResult<Json<Envelope<CartResponse>>> {
    let Some(mut cart) = cart_service::load_active(&state, &user).await? else {
        let cart = Cart::new(&user.tenant_id, &user.user_id);
        return Ok(ok(
            "Cart is empty",
            CartResponse {
                cart,
                coupons: Vec::new(),
                delivery_minutes: 0,
            },
        ));
    };

    let policy = if query.coupon_id.is_some() {
        CouponPolicy::Require
    } else {
        CouponPolicy::DropIfInvalid
    };
    let address_id = query.address_id.or_else(|| cart.address_id.clone());
    let coupon_id = query.coupon_id.or_else(|| cart.coupon_id.clone());

    let repriced = cart_service::reprice(&state, &mut cart, address_id, coupon_id, policy).await?;
    let cart = state.db.carts().save(&cart).await?;
    let coupons = applicable_coupons(&state, &cart).await?;

    Ok(ok(
        "Cart fetched",
        CartResponse {
            cart,
            coupons,
            delivery_minutes: repriced.delivery_minutes(),
        },
    ))
}

/// `POST /cart/update`
///
/// Every product is checked before the cart changes; one bad entry
/// rejects the whole batch.
async fn update_items(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateItemsRequest>,
) -> ApiResult<Json<Envelope<CartResponse>>> {
    validate_line_updates(&req.items)?;

    let ids: Vec<String> = req.items.iter().map(|i| i.product_id.clone()).collect();
    let products = state.db.products().get_many(&user.tenant_id, &ids).await?;
    for id in &ids {
        match products.get(id) {
            Some(p) if p.is_sellable() => {}
            Some(p) if !p.is_deleted => return Err(CoreError::ProductUnavailable(id.clone()).into()),
            _ => return Err(CoreError::ProductNotFound(id.clone()).into()),
        }
    }

    let (cart, repriced) =
        cart_service::mutate(&state, &user, |cart| cart.upsert_lines(&req.items)).await?;
    let coupons = applicable_coupons(&state, &cart).await?;

    Ok(ok(
        "Cart updated",
        CartResponse {
            cart,
            coupons,
            delivery_minutes: repriced.delivery_minutes(),
        },
    ))
}

/// `POST /cart/updatequantity`
async fn update_quantity(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateQuantityRequest>,
) -> ApiResult<Json<Envelope<CartResponse>>> {
    validate_id("productId", &req.product_id)?;
    validate_quantity(req.quantity)?;

    let (cart, repriced) = cart_service::mutate(&state, &user, |cart| {
        cart.set_quantity(&req.product_id, req.quantity)
    })
    .await?;
    let coupons = applicable_coupons(&state, &cart).await?;

    Ok(ok(
        "Quantity updated",
        CartResponse {
            cart,
            coupons,
            delivery_minutes: repriced.delivery_minutes(),
        },
    ))
}

/// `DELETE /cart/remove-product/{productId}`
async fn remove_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<CartResponse>>> {
    validate_id("productId", &product_id)?;

    let (cart, repriced) =
        cart_service::mutate(&state, &user, |cart| cart.remove_line(&product_id)).await?;
    let coupons = applicable_coupons(&state, &cart).await?;

    Ok(ok(
        "Product removed from cart",
        CartResponse {
            cart,
            coupons,
            delivery_minutes: repriced.delivery_minutes(),
        },
    ))
}

/// `DELETE /cart/removeall`
async fn remove_all(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<CartResponse>>> {
    let (cart, _) = cart_service::mutate(&state, &user, Cart::clear).await?;

    Ok(ok(
        "Cart cleared",
        CartResponse {
            cart,
            coupons: Vec::new(),
            delivery_minutes: 0,
        },
    ))
}

/// `GET /cart/count`
async fn count(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<CountResponse>>> {
    let count = cart_service::load_active(&state, &user)
        .await?
        .map(|cart| cart.line_count())
        .unwrap_or(0);

    Ok(ok("Cart count", CountResponse { count }))
}
