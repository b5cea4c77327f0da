//! Order fulfilment for store staff.
//!
//! ```text
//! GET   /admin/orders?status=pending
//! GET   /admin/orders/{orderNumber}
//! PATCH /admin/orders/{orderNumber}/status { status }
//!
//! pending ──► accepted ──► picked ──► delivered
//!    ├──► rejected
//!    └──► cancelled ◄── accepted
//! ```
//! Any other move is a 422. A status changed concurrently is a 409.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use bazaar_core::{CoreError, Order, OrderStatus};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{ok, Envelope};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{order_number}", get(get_order))
        .route("/{order_number}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<Json<Envelope<Vec<Order>>>> {
    let orders = state
        .db
        .orders()
        .list_for_tenant(&admin.tenant_id, query.status)
        .await?;
    Ok(ok("Orders fetched", orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(order_number): ApiPath<String>,
) -> ApiResult<Json<Envelope<Order>>> {
    let order = state
        .db
        .orders()
        .get_for_tenant(&admin.tenant_id, &order_number)
        .await?
        .ok_or(CoreError::OrderNotFound(order_number))?;
    Ok(ok("Order fetched", order))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(order_number): ApiPath<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Envelope<Order>>> {
    let mut order = state
        .db
        .orders()
        .get_for_tenant(&admin.tenant_id, &order_number)
        .await?
        .ok_or(CoreError::OrderNotFound(order_number))?;

    let from = order.status;
    order.transition(req.status)?;
    let order = state.db.orders().update_status(&order, from).await?;

    Ok(ok("Order status updated", order))
}
