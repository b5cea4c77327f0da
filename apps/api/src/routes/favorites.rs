//! The caller's saved products.
//!
//! ```text
//! GET    /favorites               products, with offers resolved
//! POST   /favorites { productId } save (saving twice is fine)
//! DELETE /favorites/{productId}   404 when not saved
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use bazaar_core::validation::validate_id;
use bazaar_core::CoreError;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{done, ok, Envelope};
use crate::services::catalog::{self, ProductView};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_favorites).post(add_favorite))
        .route("/{product_id}", delete(remove_favorite))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub product_id: String,
}

async fn list_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Vec<ProductView>>>> {
    let products = catalog::list_favorites(&state, &user.tenant_id, &user.user_id).await?;
    Ok(ok("Favorites fetched", products))
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<FavoriteRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    validate_id("productId", &req.product_id)?;

    if state
        .db
        .products()
        .get(&user.tenant_id, &req.product_id)
        .await?
        .is_none()
    {
        return Err(CoreError::ProductNotFound(req.product_id).into());
    }

    let added = state
        .db
        .favorites()
        .add(&user.tenant_id, &user.user_id, &req.product_id)
        .await?;
    debug!(product_id = %req.product_id, added, "Favorite added");

    Ok(done("Added to favorites"))
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<()>>> {
    let removed = state
        .db
        .favorites()
        .remove(&user.tenant_id, &user.user_id, &product_id)
        .await?;
    if !removed {
        return Err(CoreError::FavoriteNotFound(product_id).into());
    }

    Ok(done("Removed from favorites"))
}
