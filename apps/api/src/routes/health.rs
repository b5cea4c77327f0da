//! Liveness and database status. Unauthenticated.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use bazaar_db::migrations::migration_status;

use crate::response::Envelope;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub database: &'static str,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    pub server_time: DateTime<Utc>,
}

/// 200 when the database answers, 503 otherwise.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Envelope<HealthReport>>) {
    let healthy = state.db.health_check().await;
    let (total, applied) = match migration_status(state.db.pool()).await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            (0, 0)
        }
    };

    let report = HealthReport {
        database: if healthy { "ok" } else { "unavailable" },
        migrations_total: total,
        migrations_applied: applied,
        server_time: Utc::now(),
    };

    let (status, message) = if healthy && total == applied {
        (StatusCode::OK, "Healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Unhealthy")
    };

    (
        status,
        Json(Envelope {
            message: message.to_string(),
            status: status.is_success(),
            data: Some(report),
        }),
    )
}
