//! Catalog management.
//!
//! ```text
//! POST   /admin/products               create
//! PATCH  /admin/products/{id}          partial update
//! POST   /admin/products/{id}/disable  switch off, optionally until reEnableAt
//! DELETE /admin/products/{id}          soft delete
//! ```
//! A disabled product with `reEnableAt` is switched back on by the
//! background job once that time passes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bazaar_core::validation::{
    validate_bps, validate_price_cents, validate_product_code, validate_product_name,
};
use bazaar_core::{CoreError, Product, ValidationError};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::response::{created, done, ok, Envelope};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/{id}", patch(update_product).delete(delete_product))
        .route("/{id}/disable", post(disable_product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub product_code: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Defaults to the selling price.
    pub strike_price_cents: Option<i64>,
    pub gst_bps: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub strike_price_cents: Option<i64>,
    pub gst_bps: Option<u32>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableRequest {
    pub re_enable_at: Option<DateTime<Utc>>,
}

fn validate_product(product: &Product) -> Result<(), ValidationError> {
    validate_product_name(&product.name)?;
    validate_product_code(&product.product_code)?;
    validate_price_cents("priceCents", product.price_cents)?;
    validate_price_cents("strikePriceCents", product.strike_price_cents)?;
    validate_bps("gstBps", product.gst_bps)
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Product>>)> {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        tenant_id: admin.tenant_id,
        name: req.name.trim().to_string(),
        product_code: req.product_code.trim().to_string(),
        description: req.description,
        price_cents: req.price_cents,
        strike_price_cents: req.strike_price_cents.unwrap_or(req.price_cents),
        gst_bps: req.gst_bps,
        active: req.active,
        is_deleted: false,
        re_enabled_at: None,
        created_at: now,
        updated_at: now,
    };
    validate_product(&product)?;

    let product = state.db.products().insert(&product).await?;
    info!(product_id = %product.id, code = %product.product_code, "Product created");

    Ok(created("Product created", product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> ApiResult<Json<Envelope<Product>>> {
    let mut product = state
        .db
        .products()
        .get(&admin.tenant_id, &id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.clone()))?;

    if let Some(name) = req.name {
        product.name = name.trim().to_string();
    }
    if let Some(code) = req.product_code {
        product.product_code = code.trim().to_string();
    }
    if let Some(description) = req.description {
        product.description = Some(description);
    }
    if let Some(price) = req.price_cents {
        product.price_cents = price;
    }
    if let Some(strike) = req.strike_price_cents {
        product.strike_price_cents = strike;
    }
    if let Some(gst) = req.gst_bps {
        product.gst_bps = gst;
    }
    if let Some(active) = req.active {
        product.active = active;
        if active {
            product.re_enabled_at = None;
        }
    }
    validate_product(&product)?;

    state.db.products().update(&product).await?;
    product.updated_at = Utc::now();

    Ok(ok("Product updated", product))
}

/// The body is optional: no body disables until switched back on by hand.
async fn disable_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    body: Bytes,
) -> ApiResult<Json<Envelope<()>>> {
    let req: DisableRequest = if body.is_empty() {
        DisableRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation(e.to_string()))?
    };

    if let Some(at) = req.re_enable_at {
        if at <= Utc::now() {
            return Err(ValidationError::InvalidFormat {
                field: "reEnableAt".to_string(),
                reason: "must be in the future".to_string(),
            }
            .into());
        }
    }

    state
        .db
        .products()
        .disable(&admin.tenant_id, &id, req.re_enable_at)
        .await?;
    info!(product_id = %id, re_enable_at = ?req.re_enable_at, "Product disabled");

    Ok(done("Product disabled"))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Envelope<()>>> {
    state.db.products().soft_delete(&admin.tenant_id, &id).await?;
    info!(product_id = %id, "Product deleted");

    Ok(done("Product deleted"))
}
