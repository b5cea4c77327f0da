//! # Distance Providers
//!
//! Route distance and travel time from the store to a delivery address.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DistanceProvider::route(store, address)                               │
//! │       │                                                                 │
//! │       ├── MAPS_API_KEY set  → GoogleMapsClient (Distance Matrix, HTTPS) │
//! │       │                        road distance, traffic-free duration     │
//! │       │                                                                 │
//! │       └── otherwise         → HaversineEstimator                        │
//! │                                great-circle distance, fixed avg speed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use bazaar_core::{GeoPoint, RouteEstimate};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Distance lookup failures.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("Distance request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Distance service returned status {0}")]
    Status(String),

    #[error("No route between the store and the address")]
    NoRoute,
}

/// Source of route estimates.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, DistanceError>;
}

// =============================================================================
// Google Distance Matrix
// =============================================================================

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixValue>,
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: i64,
}

impl MatrixResponse {
    fn into_route(self) -> Result<RouteEstimate, DistanceError> {
        if self.status != "OK" {
            return Err(DistanceError::Status(self.status));
        }

        let element = self
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or(DistanceError::NoRoute)?;

        if element.status != "OK" {
            return Err(DistanceError::NoRoute);
        }

        match (element.distance, element.duration) {
            (Some(distance), Some(duration)) => Ok(RouteEstimate {
                distance_meters: distance.value,
                duration_seconds: duration.value,
            }),
            _ => Err(DistanceError::NoRoute),
        }
    }
}

/// Road distances from the Google Distance Matrix API.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, DistanceError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(GoogleMapsClient {
            http,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl DistanceProvider for GoogleMapsClient {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, DistanceError> {
        let origins = format!("{},{}", origin.latitude, origin.longitude);
        let destinations = format!("{},{}", destination.latitude, destination.longitude);

        let response: MatrixResponse = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let route = response.into_route()?;
        debug!(
            distance_m = route.distance_meters,
            duration_s = route.duration_seconds,
            "Distance Matrix route"
        );
        Ok(route)
    }
}

// =============================================================================
// Haversine
// =============================================================================

/// Straight-line estimate for deployments without a maps key.
#[derive(Debug, Clone)]
pub struct HaversineEstimator {
    average_speed_kmh: f64,
}

impl HaversineEstimator {
    pub fn new(average_speed_kmh: f64) -> Self {
        HaversineEstimator { average_speed_kmh }
    }

    /// Great-circle distance in metres.
    pub fn distance_meters(origin: GeoPoint, destination: GeoPoint) -> f64 {
        let lat1 = origin.latitude.to_radians();
        let lat2 = destination.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (destination.longitude - origin.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }

    pub fn estimate(&self, origin: GeoPoint, destination: GeoPoint) -> RouteEstimate {
        let meters = Self::distance_meters(origin, destination);
        let meters_per_second = self.average_speed_kmh * 1000.0 / 3600.0;
        RouteEstimate {
            distance_meters: meters.round() as i64,
            duration_seconds: (meters / meters_per_second).ceil() as i64,
        }
    }
}

#[async_trait]
impl DistanceProvider for HaversineEstimator {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, DistanceError> {
        Ok(self.estimate(origin, destination))
    }
}
