//! # Routes
//!
//! ```text
//! ┌──────────────────────────────────┬──────────┬────────────────────────┐
//! │ Path                             │ Auth     │ Module                 │
//! ├──────────────────────────────────┼──────────┼────────────────────────┤
//! │ /health                          │ none     │ health                 │
//! │ /cart, /cart/*                   │ user     │ cart                   │
//! │ /orders, /orders/{orderNumber}/* │ user     │ orders                 │
//! │ /favorites, /favorites/{id}      │ user     │ favorites              │
//! │ /products, /products/{id}        │ user     │ products               │
//! │ /offers, /offers/negotiate       │ user     │ offers                 │
//! │ /addresses, /addresses/{id}      │ user     │ addresses              │
//! │ /admin/products/*                │ admin    │ admin::products        │
//! │ /admin/coupons/*                 │ admin    │ admin::coupons         │
//! │ /admin/offers/*                  │ admin    │ admin::offers          │
//! │ /admin/orders/*                  │ admin    │ admin::orders          │
//! └──────────────────────────────────┴──────────┴────────────────────────┘
//! ```
//! Authentication is enforced per handler through the `AuthUser` and
//! `AdminUser` extractors.

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod favorites;
pub mod health;
pub mod offers;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Every route of the API, before state is attached.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/favorites", favorites::router())
        .nest("/products", products::router())
        .nest("/offers", offers::router())
        .nest("/addresses", addresses::router())
        .nest("/admin", admin::router())
}
