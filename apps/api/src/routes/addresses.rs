//! Saved delivery addresses of the caller.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use bazaar_core::validation::{validate_address_text, validate_coordinates};
use bazaar_core::Address;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{created, done, ok, Envelope};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/{id}", delete(delete_address))
}

#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    pub label: String,
    pub line: String,
    pub latitude: f64,
    pub longitude: f64,
}

async fn list_addresses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Vec<Address>>>> {
    let addresses = state
        .db
        .addresses()
        .list(&user.tenant_id, &user.user_id)
        .await?;
    Ok(ok("Addresses fetched", addresses))
}

async fn create_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Address>>)> {
    validate_address_text(&req.label, &req.line)?;
    validate_coordinates(req.latitude, req.longitude)?;

    let address = Address {
        id: Uuid::new_v4().to_string(),
        tenant_id: user.tenant_id,
        user_id: user.user_id,
        label: req.label.trim().to_string(),
        line: req.line.trim().to_string(),
        latitude: req.latitude,
        longitude: req.longitude,
        created_at: Utc::now(),
    };
    let address = state.db.addresses().insert(&address).await?;

    Ok(created("Address saved", address))
}

async fn delete_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Envelope<()>>> {
    state
        .db
        .addresses()
        .delete(&user.tenant_id, &user.user_id, &id)
        .await?;
    Ok(done("Address deleted"))
}
