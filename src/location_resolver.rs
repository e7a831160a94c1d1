//! Location Resolution Module
//!
//! Turns shipment location identifiers (US zip codes or "lat,lon" pairs)
//! into coordinates for forecast queries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::IceError;
use crate::models::{Location, LocationInput};

/// Resolves a location identifier into coordinates
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Fails with [`IceError::LocationNotFound`] for identifiers that name no place.
    async fn resolve(&self, location_id: &str) -> crate::Result<Location>;
}

/// Resolver backed by the Open-Meteo geocoding API
///
/// Coordinates are taken as given; zip codes are looked up among US results.
#[derive(Debug, Clone)]
pub struct GeocodingLocationResolver {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeocodingLocationResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icepack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IceError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Resolve a postal code to coordinates via geocoding
    async fn resolve_postal_code(&self, postal: &str) -> crate::Result<Location> {
        debug!("Geocoding postal code: {}", postal);

        let url = format!(
            "{}/search?name={}&count=10&language=en&format=json&countryCode=US",
            self.base_url,
            urlencoding::encode(postal)
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                IceError::timeout(format!("geocoding {postal}"), self.timeout.as_secs())
            } else {
                IceError::api(format!("geocoding request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(IceError::api(format!(
                "geocoding service returned {} for {postal}",
                response.status()
            )));
        }

        let payload: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| IceError::api(format!("Failed to parse geocoding response: {e}")))?;

        let location = best_postal_match(postal, payload.results.unwrap_or_default())
            .ok_or_else(|| IceError::location_not_found(postal))?;

        debug!(
            "Found location for postal code {}: {:?} ({:.4}, {:.4})",
            postal, location.name, location.latitude, location.longitude
        );
        Ok(location)
    }
}

#[async_trait]
impl LocationResolver for GeocodingLocationResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, location_id: &str) -> crate::Result<Location> {
        let location = match LocationInput::parse(location_id) {
            Ok(LocationInput::Coordinates(lat, lon)) => Location::new(lat, lon, location_id.trim()),
            Ok(LocationInput::PostalCode(postal)) => self.resolve_postal_code(&postal).await?,
            Err(e) => {
                warn!("Unrecognized location identifier '{}': {}", location_id, e);
                return Err(IceError::location_not_found(location_id));
            }
        };

        debug!(
            "Resolved location {} to ({}, {})",
            location.id, location.latitude, location.longitude
        );
        Ok(location)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
    admin1: Option<String>,
    #[serde(default)]
    postcodes: Vec<String>,
}

/// Prefer a US result listing the postal code itself; fall back to the first US result.
fn best_postal_match(postal: &str, results: Vec<GeocodingResult>) -> Option<Location> {
    let mut us_results: Vec<GeocodingResult> = results
        .into_iter()
        .filter(|r| r.country_code.as_deref().is_none_or(|code| code.eq_ignore_ascii_case("US")))
        .collect();
    if us_results.is_empty() {
        return None;
    }

    let index = us_results
        .iter()
        .position(|r| r.postcodes.iter().any(|p| p == postal))
        .unwrap_or(0);
    let result = us_results.swap_remove(index);
    let name = match result.admin1 {
        Some(state) => format!("{}, {}", result.name, state),
        None => result.name,
    };
    Some(Location::new(result.latitude, result.longitude, postal).with_name(name))
}
