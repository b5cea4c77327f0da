//! Tenant administration. Every handler takes an [`AdminUser`], so a
//! non-admin token is answered with 403 before any work is done.
//!
//! [`AdminUser`]: crate::auth::AdminUser

pub mod coupons;
pub mod offers;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/products", products::router())
        .nest("/coupons", coupons::router())
        .nest("/offers", offers::router())
        .nest("/orders", orders::router())
}
