//! Coupon management.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bazaar_core::validation::{validate_bps, validate_coupon_code, validate_ordered, validate_price_cents};
use bazaar_core::Coupon;

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{created, done, ok, Envelope};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_coupon).get(list_coupons))
        .route("/{id}", patch(set_active))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub code: String,
    pub discount_bps: u32,
    pub min_price_cents: i64,
    pub max_price_cents: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

async fn create_coupon(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateCouponRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Coupon>>)> {
    validate_coupon_code(&req.code)?;
    validate_bps("discountBps", req.discount_bps)?;
    validate_price_cents("minPriceCents", req.min_price_cents)?;
    validate_price_cents("maxPriceCents", req.max_price_cents)?;
    validate_ordered("minPriceCents", req.min_price_cents, "maxPriceCents", req.max_price_cents)?;

    let coupon = Coupon {
        id: Uuid::new_v4().to_string(),
        tenant_id: admin.tenant_id,
        code: req.code.trim().to_uppercase(),
        discount_bps: req.discount_bps,
        min_price_cents: req.min_price_cents,
        max_price_cents: req.max_price_cents,
        active: req.active,
        created_at: Utc::now(),
    };
    let coupon = state.db.coupons().insert(&coupon).await?;
    info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");

    Ok(created("Coupon created", coupon))
}

async fn list_coupons(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Envelope<Vec<Coupon>>>> {
    let coupons = state.db.coupons().list(&admin.tenant_id).await?;
    Ok(ok("Coupons fetched", coupons))
}

/// `PATCH /admin/coupons/{id}` with `{ "active": bool }`.
async fn set_active(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    state
        .db
        .coupons()
        .set_active(&admin.tenant_id, &id, req.active)
        .await?;
    info!(coupon_id = %id, active = req.active, "Coupon toggled");

    Ok(done(if req.active {
        "Coupon activated"
    } else {
        "Coupon deactivated"
    }))
}
