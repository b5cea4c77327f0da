//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! A `.env` file, if present, is loaded first by `main`.

use std::env;

use bazaar_core::validation::validate_coordinates;
use bazaar_core::{
    GeoPoint, Money, PricingConfig, DEFAULT_CART_TTL_DAYS, DEFAULT_MAX_NEGOTIATION_ATTEMPTS,
};

/// Development secret used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "bazaar-dev-secret-change-in-production";

const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    pub db_max_connections: u32,

    /// JWT secret key for verifying tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Google Distance Matrix key; the haversine estimator is used without one
    pub maps_api_key: Option<String>,

    pub maps_base_url: String,

    /// Where deliveries start from
    pub store_location: GeoPoint,

    pub platform_fee_cents: i64,

    pub delivery_rate_cents_per_km: i64,

    /// Distance delivered free of charge, in metres
    pub free_delivery_distance_meters: i64,

    /// Subtotal at which delivery becomes free (unset = never)
    pub free_delivery_threshold_cents: Option<i64>,

    pub cart_ttl_days: i64,

    /// Attempt cap for negotiate offers that do not set one
    pub max_negotiation_attempts: u32,

    /// Interval of the product re-enable and cart expiry job
    pub reenable_interval_secs: u64,

    /// Speed assumed by the haversine estimator
    pub average_speed_kmh: f64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let free_km: f64 = parse_or(&lookup, "FREE_DELIVERY_DISTANCE_KM", 0.0)?;
        if free_km < 0.0 {
            return Err(ConfigError::InvalidValue("FREE_DELIVERY_DISTANCE_KM".to_string()));
        }

        let config = ApiConfig {
            http_port: parse_or(&lookup, "BAZAAR_HTTP_PORT", 8080)?,

            database_path: lookup("BAZAAR_DATABASE_PATH").unwrap_or_else(|| "bazaar.db".to_string()),

            db_max_connections: parse_or(&lookup, "BAZAAR_DB_MAX_CONNECTIONS", 5)?,

            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),

            jwt_access_lifetime_secs: parse_or(&lookup, "JWT_ACCESS_LIFETIME_SECS", 3600)?, // 1 hour

            maps_api_key: lookup("MAPS_API_KEY").filter(|k| !k.is_empty()),

            maps_base_url: lookup("MAPS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MAPS_BASE_URL.to_string()),

            store_location: GeoPoint::new(
                parse_or(&lookup, "STORE_LATITUDE", 12.9716)?,
                parse_or(&lookup, "STORE_LONGITUDE", 77.5946)?,
            ),

            platform_fee_cents: parse_or(&lookup, "PLATFORM_FEE_CENTS", 500)?,

            delivery_rate_cents_per_km: parse_or(&lookup, "DELIVERY_RATE_CENTS_PER_KM", 1000)?,

            free_delivery_distance_meters: (free_km * 1000.0).round() as i64,

            free_delivery_threshold_cents: match lookup("FREE_DELIVERY_THRESHOLD_CENTS") {
                Some(raw) => Some(raw.parse().map_err(|_| {
                    ConfigError::InvalidValue("FREE_DELIVERY_THRESHOLD_CENTS".to_string())
                })?),
                None => None,
            },

            cart_ttl_days: parse_or(&lookup, "CART_TTL_DAYS", DEFAULT_CART_TTL_DAYS)?,

            max_negotiation_attempts: parse_or(
                &lookup,
                "MAX_NEGOTIATION_ATTEMPTS",
                DEFAULT_MAX_NEGOTIATION_ATTEMPTS,
            )?,

            reenable_interval_secs: parse_or(&lookup, "REENABLE_INTERVAL_SECS", 60)?,

            average_speed_kmh: parse_or(&lookup, "AVERAGE_SPEED_KMH", 25.0)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_coordinates(self.store_location.latitude, self.store_location.longitude)
            .map_err(|_| ConfigError::InvalidValue("STORE_LATITUDE/STORE_LONGITUDE".to_string()))?;

        let non_negative = [
            ("PLATFORM_FEE_CENTS", self.platform_fee_cents),
            ("DELIVERY_RATE_CENTS_PER_KM", self.delivery_rate_cents_per_km),
            (
                "FREE_DELIVERY_THRESHOLD_CENTS",
                self.free_delivery_threshold_cents.unwrap_or(0),
            ),
        ];
        if let Some((key, _)) = non_negative.iter().find(|(_, v)| *v < 0) {
            return Err(ConfigError::InvalidValue(key.to_string()));
        }

        if self.cart_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue("CART_TTL_DAYS".to_string()));
        }
        if self.max_negotiation_attempts == 0 {
            return Err(ConfigError::InvalidValue("MAX_NEGOTIATION_ATTEMPTS".to_string()));
        }
        if self.reenable_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("REENABLE_INTERVAL_SECS".to_string()));
        }
        if self.average_speed_kmh.is_nan() || self.average_speed_kmh <= 0.0 {
            return Err(ConfigError::InvalidValue("AVERAGE_SPEED_KMH".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }

        Ok(())
    }

    /// Fee settings for the pricing engine.
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            platform_fee: Money::from_cents(self.platform_fee_cents),
            delivery_rate_cents_per_km: self.delivery_rate_cents_per_km,
            free_distance_meters: self.free_delivery_distance_meters,
            free_delivery_threshold: self.free_delivery_threshold_cents.map(Money::from_cents),
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
