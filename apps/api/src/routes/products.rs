//! Storefront product reads.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use bazaar_core::CoreError;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::response::{ok, Envelope};
use crate::services::catalog::{self, ProductView};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Vec<ProductView>>>> {
    let products = catalog::list_products(&state, &user.tenant_id).await?;
    Ok(ok("Products fetched", products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Envelope<ProductView>>> {
    let product = catalog::get_product(&state, &user.tenant_id, &id)
        .await?
        .ok_or(CoreError::ProductNotFound(id))?;
    Ok(ok("Product fetched", product))
}
