//! Success envelope.
//!
//! ```text
//! { "message": "Cart updated", "status": true, "data": { ... } }
//! ```
//! Failures use the same shape via [`crate::error::ApiError`].

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 with a payload.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        message: message.into(),
        status: true,
        data: Some(data),
    })
}

/// 201 with the created resource.
pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(message, data))
}

/// 200 without a payload.
pub fn done(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        message: message.into(),
        status: true,
        data: None,
    })
}
