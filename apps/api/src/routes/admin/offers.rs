//! Offer management.
//!
//! ```text
//! POST   /admin/offers                          { isActive, terms: { type, ... } }
//! GET    /admin/offers?type                     all, active or not
//! GET    /admin/offers/{id}
//! PUT    /admin/offers/{id}                     replace terms, same type only
//! POST   /admin/offers/{id}/items               add one product
//! PATCH  /admin/offers/{id}/items               update listed products' values
//! DELETE /admin/offers/{id}/items/{productId}   remove one product
//! ```
//! A product already held by another discount/MRP offer (or another
//! negotiate offer) is answered with 409 by the membership index. A
//! negotiate floor above the product's price is a 422.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bazaar_core::offer::OfferItem;
use bazaar_core::{CoreError, Offer, OfferTerms};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{created, ok, Envelope};
use crate::routes::offers::OfferQuery;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_offer).get(list_offers))
        .route("/{id}", get(get_offer).put(replace_offer))
        .route("/{id}/items", post(add_item).patch(update_items))
        .route("/{id}/items/{product_id}", delete(remove_item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferRequest {
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub terms: OfferTerms,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOfferRequest {
    pub is_active: Option<bool>,
    pub terms: OfferTerms,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemsRequest {
    pub items: Vec<OfferItem>,
}

fn default_active() -> bool {
    true
}

/// Every product an offer lists must exist in the tenant's catalog, and a
/// negotiate floor may not exceed the product's price.
async fn check_listed_products(state: &AppState, tenant_id: &str, terms: &OfferTerms) -> ApiResult<()> {
    let ids: Vec<String> = terms.product_ids().into_iter().map(str::to_string).collect();
    let products = state.db.products().get_many(tenant_id, &ids).await?;

    for id in ids {
        let product = products
            .get(&id)
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| CoreError::ProductNotFound(id.clone()))?;

        if let Some(floor) = terms.floor_price(&id) {
            if floor > product.price() {
                return Err(CoreError::FloorAboveListPrice {
                    product_id: id,
                    floor_cents: floor.cents(),
                    price_cents: product.price_cents,
                }
                .into());
            }
        }
    }

    Ok(())
}

async fn load_offer(state: &AppState, tenant_id: &str, id: &str) -> ApiResult<Offer> {
    state
        .db
        .offers()
        .get(tenant_id, id)
        .await?
        .ok_or_else(|| CoreError::OfferNotFound(id.to_string()).into())
}

async fn create_offer(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateOfferRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Offer>>)> {
    req.terms.validate()?;
    check_listed_products(&state, &admin.tenant_id, &req.terms).await?;

    let now = Utc::now();
    let offer = Offer {
        id: Uuid::new_v4().to_string(),
        tenant_id: admin.tenant_id,
        is_active: req.is_active,
        terms: req.terms,
        created_at: now,
        updated_at: now,
    };
    let offer = state.db.offers().insert(&offer).await?;
    info!(offer_id = %offer.id, kind = offer.kind().as_str(), "Offer created");

    Ok(created("Offer created", offer))
}

async fn list_offers(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<OfferQuery>,
) -> ApiResult<Json<Envelope<Vec<Offer>>>> {
    let offers = state
        .db
        .offers()
        .list(&admin.tenant_id, query.kind()?, false)
        .await?;
    Ok(ok("Offers fetched", offers))
}

async fn get_offer(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Offer>>> {
    let offer = load_offer(&state, &admin.tenant_id, &id).await?;
    Ok(ok("Offer fetched", offer))
}

async fn replace_offer(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<ReplaceOfferRequest>,
) -> ApiResult<Json<Envelope<Offer>>> {
    let mut offer = load_offer(&state, &admin.tenant_id, &id).await?;
    offer.replace_terms(req.terms)?;
    if let Some(is_active) = req.is_active {
        offer.is_active = is_active;
    }
    check_listed_products(&state, &admin.tenant_id, &offer.terms).await?;

    let offer = state.db.offers().update(&offer).await?;
    info!(offer_id = %offer.id, active = offer.is_active, "Offer replaced");

    Ok(ok("Offer updated", offer))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(item): ApiJson<OfferItem>,
) -> ApiResult<Json<Envelope<Offer>>> {
    let mut offer = load_offer(&state, &admin.tenant_id, &id).await?;
    let product_id = item.product_id().to_string();
    offer.add_item(item)?;
    check_listed_products(&state, &admin.tenant_id, &offer.terms).await?;

    let offer = state.db.offers().update(&offer).await?;
    info!(offer_id = %offer.id, product_id = %product_id, "Product added to offer");

    Ok(ok("Product added to offer", offer))
}

async fn update_items(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateItemsRequest>,
) -> ApiResult<Json<Envelope<Offer>>> {
    let mut offer = load_offer(&state, &admin.tenant_id, &id).await?;
    offer.update_items(req.items)?;
    check_listed_products(&state, &admin.tenant_id, &offer.terms).await?;

    let offer = state.db.offers().update(&offer).await?;
    Ok(ok("Offer items updated", offer))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath((id, product_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<Envelope<Offer>>> {
    let mut offer = load_offer(&state, &admin.tenant_id, &id).await?;
    offer.remove_item(&product_id)?;

    let offer = state.db.offers().update(&offer).await?;
    info!(offer_id = %offer.id, product_id = %product_id, "Product removed from offer");

    Ok(ok("Product removed from offer", offer))
}
