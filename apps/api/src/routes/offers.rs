//! Storefront offers and price negotiation.
//!
//! ```text
//! POST /offers/negotiate { productId, amountCents }
//!     │
//!     ├── product (404) ── active negotiate offer listing it (422 otherwise)
//!     ├── prior attempts of this user on this product
//!     ├── evaluate_attempt (cap, floor clamp, success/failure bps)
//!     └── record attempt   UNIQUE (tenant, user, product, attempt_no)
//!                          a concurrent duplicate → 409
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use bazaar_core::negotiation::evaluate_attempt;
use bazaar_core::validation::validate_id;
use bazaar_core::{
    AttemptOutcome, CoreError, Money, NegotiationAttempt, Offer, OfferKind, OfferSlot, OfferTerms,
};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::{ok, Envelope};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_offers))
        .route("/negotiate", post(negotiate))
}

#[derive(Debug, Deserialize)]
pub struct OfferQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl OfferQuery {
    /// The requested kind; an unknown type is a 400.
    pub fn kind(&self) -> ApiResult<Option<OfferKind>> {
        Ok(self.kind.as_deref().map(str::parse::<OfferKind>).transpose()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateRequest {
    pub product_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    pub product_id: String,
    pub offer_id: String,
    pub attempt_no: u32,
    pub outcome: AttemptOutcome,
    pub resulting_price_cents: i64,
    pub remaining_attempts: u32,
}

/// `GET /offers?type`, active offers only.
async fn list_offers(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OfferQuery>,
) -> ApiResult<Json<Envelope<Vec<Offer>>>> {
    let offers = state
        .db
        .offers()
        .list(&user.tenant_id, query.kind()?, true)
        .await?;
    Ok(ok("Offers fetched", offers))
}

async fn negotiate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<NegotiateRequest>,
) -> ApiResult<Json<Envelope<NegotiateResponse>>> {
    validate_id("productId", &req.product_id)?;

    let product = state
        .db
        .products()
        .get(&user.tenant_id, &req.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(req.product_id.clone()))?;

    let offer = state
        .db
        .offers()
        .active_for_product(&user.tenant_id, &product.id, OfferSlot::Negotiate)
        .await?
        .ok_or_else(|| CoreError::NotNegotiable(product.id.clone()))?;
    let OfferTerms::Negotiate(terms) = &offer.terms else {
        return Err(CoreError::NotNegotiable(product.id.clone()).into());
    };

    // Attempts count per offer; a replacement offer starts fresh
    let prior = state
        .db
        .negotiations()
        .list_for(&user.tenant_id, &user.user_id, &product.id, &offer.id)
        .await?;

    let result = evaluate_attempt(
        terms,
        &product.id,
        product.price(),
        Money::from_cents(req.amount_cents),
        &prior,
        state.config.max_negotiation_attempts,
    )?;

    let attempt = NegotiationAttempt {
        id: Uuid::new_v4().to_string(),
        tenant_id: user.tenant_id.clone(),
        user_id: user.user_id.clone(),
        product_id: product.id.clone(),
        offer_id: offer.id.clone(),
        attempt_no: result.attempt_no,
        proposed_cents: req.amount_cents,
        resulting_price_cents: result.resulting_price.cents(),
        outcome: result.outcome,
        created_at: Utc::now(),
    };
    state.db.negotiations().record(&attempt).await?;

    info!(
        product_id = %product.id,
        user_id = %user.user_id,
        attempt_no = result.attempt_no,
        outcome = ?result.outcome,
        price = result.resulting_price.cents(),
        "Negotiation attempt recorded"
    );

    let message = match result.outcome {
        AttemptOutcome::Accepted => "Offer accepted",
        AttemptOutcome::Rejected => "Offer below the floor price",
    };
    Ok(ok(
        message,
        NegotiateResponse {
            product_id: product.id,
            offer_id: offer.id.clone(),
            attempt_no: result.attempt_no,
            outcome: result.outcome,
            resulting_price_cents: result.resulting_price.cents(),
            remaining_attempts: result.remaining_attempts,
        },
    ))
}
