//! # Bazaar API
//!
//! HTTP/JSON server for storefront users and tenant admins.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Bazaar API                                   │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /cart         │  │  /orders       │  │  /admin                    ││
//! │  │                │  │                │  │                            ││
//! │  │ • GET (price)  │  │ • POST (place) │  │ • products (CRUD, disable) ││
//! │  │ • update       │  │ • GET list     │  │ • coupons                  ││
//! │  │ • remove/clear │  │ • GET {number} │  │ • offers + items           ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐            │
//! │  │  /products     │  │  /offers       │  │  /addresses    │  /health   │
//! │  │  (+ offer)     │  │  • negotiate   │  │                │            │
//! │  └────────────────┘  └────────────────┘  └────────────────┘            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │  SQLite (bazaar-db) · PricingEngine · DistanceProvider · JWT      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables are listed on [`config::ApiConfig`].

pub mod auth;
pub mod config;
pub mod distance;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod response;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bazaar_core::PricingEngine;
use bazaar_db::Database;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use distance::DistanceProvider;
pub use error::{ApiError, ApiResult};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub jwt: JwtManager,
    pub distance: Arc<dyn DistanceProvider>,
    pub pricing: PricingEngine,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig, distance: Arc<dyn DistanceProvider>) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_access_lifetime_secs);
        let pricing = PricingEngine::new(config.pricing_config());
        AppState {
            db,
            config,
            jwt,
            distance,
            pricing,
        }
    }
}

/// Builds the full router with tracing and CORS layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
