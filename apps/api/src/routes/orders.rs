//! Order placement and history.
//!
//! ```text
//! POST /orders { addressId, couponId?, paymentMethod }
//!     │
//!     ├── address must belong to the caller          → 404
//!     ├── active cart with at least one line         → 422 "Cart is empty"
//!     ├── reprice against the address and coupon     (coupon must apply)
//!     ├── cart: active → completed
//!     └── OrderRepository::place                     one transaction:
//!           cart write (version checked) + order + order items
//!
//! POST /orders/{orderNumber}/cancel     pending only, else 422
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use bazaar_core::validation::validate_id;
use bazaar_core::{CartStatus, CoreError, Order, PaymentMethod};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{created, ok, Envelope};
use crate::services::cart::{self as cart_service, CouponPolicy};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/{order_number}", get(get_order))
        .route("/{order_number}/cancel", post(cancel_order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub address_id: String,
    pub coupon_id: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Order>>)> {
    validate_id("addressId", &req.address_id)?;
    if let Some(coupon_id) = &req.coupon_id {
        validate_id("couponId", coupon_id)?;
    }

    if state
        .db
        .addresses()
        .get(&user.tenant_id, &user.user_id, &req.address_id)
        .await?
        .is_none()
    {
        return Err(CoreError::AddressNotFound(req.address_id).into());
    }

    let mut cart = cart_service::load_active(&state, &user)
        .await?
        .ok_or(CoreError::EmptyCart)?;
    if cart.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let repriced = cart_service::reprice(
        &state,
        &mut cart,
        Some(req.address_id),
        req.coupon_id,
        CouponPolicy::Require,
    )
    .await?;

    cart.transition(CartStatus::Completed)?;
    let order = Order::from_cart(&cart, repriced.coupon.map(|c| c.code), req.payment_method)?;
    let order = state.db.orders().place(&cart, &order).await?;

    Ok(created("Order placed", order))
}

/// Newest first.
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Vec<Order>>>> {
    let orders = state.db.orders().list(&user.tenant_id, &user.user_id).await?;
    Ok(ok("Orders fetched", orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(order_number): ApiPath<String>,
) -> ApiResult<Json<Envelope<Order>>> {
    let order = state
        .db
        .orders()
        .get_by_number(&user.tenant_id, &user.user_id, &order_number)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_number))?;
    Ok(ok("Order fetched", order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(order_number): ApiPath<String>,
) -> ApiResult<Json<Envelope<Order>>> {
    let mut order = state
        .db
        .orders()
        .get_by_number(&user.tenant_id, &user.user_id, &order_number)
        .await?
        .ok_or(CoreError::OrderNotFound(order_number))?;

    let from = order.status;
    order.cancel_by_customer()?;
    let order = state.db.orders().update_status(&order, from).await?;

    Ok(ok("Order cancelled", order))
}
