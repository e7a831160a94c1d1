//! Location model for geographic coordinates and the inputs that name them

use serde::{Deserialize, Serialize};

use crate::IceError;

/// A resolved geographic point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Identifier this location was resolved from (zip code or "lat,lon")
    pub id: String,
    /// Place name, when the resolver knows one
    pub name: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, id: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            id: id.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Parsed form of a location identifier
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Five-digit US zip code
    PostalCode(String),
    /// Latitude and longitude given directly
    Coordinates(f64, f64),
}

impl LocationInput {
    /// Parse a location identifier
    ///
    /// Accepts a five-digit US zip code or `"lat,lon"` in decimal degrees.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IceError::validation("location cannot be empty"));
        }

        if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::PostalCode(trimmed.to_string()));
        }

        if let Some((lat, lon)) = trimmed.split_once(',') {
            let lat: f64 = lat
                .trim()
                .parse()
                .map_err(|_| IceError::validation(format!("invalid latitude in '{trimmed}'")))?;
            let lon: f64 = lon
                .trim()
                .parse()
                .map_err(|_| IceError::validation(format!("invalid longitude in '{trimmed}'")))?;

            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(IceError::validation(format!(
                    "coordinates out of range: '{trimmed}'"
                )));
            }
            return Ok(Self::Coordinates(lat, lon));
        }

        Err(IceError::validation(format!(
            "'{trimmed}' is neither a 5-digit zip code nor \"lat,lon\""
        )))
    }
}
