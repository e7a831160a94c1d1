//! Shipment request and computed shipment records

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Shipment fields as submitted by the caller
///
/// The short keys of the first API version (`ship_n`, `dep_zip`, ...) are
/// accepted as aliases.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ShipmentRequest {
    #[serde(alias = "ship_n", default)]
    pub shipment_id: String,
    #[serde(alias = "dep_zip", deserialize_with = "location_id")]
    pub departure: String,
    #[serde(alias = "dest_zip", deserialize_with = "location_id")]
    pub destination: String,
    #[serde(alias = "dep_date", default)]
    pub departure_date: Option<String>,
    #[serde(alias = "f_weight")]
    pub food_weight: f64,
}

/// A fully computed shipment
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Shipment {
    pub shipment_id: String,
    pub departure: String,
    pub destination: String,
    /// Serialized as `YYYY-MM-DD`
    pub departure_date: NaiveDate,
    /// Food weight in pounds
    pub food_weight: f64,
    /// Worst-case forecast temperature in °F, one decimal
    pub temperature: f64,
    /// Set when `temperature` is the fallback default rather than a forecast
    pub temperature_degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    /// Recommended ice in pounds, always even
    pub ice_weight: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocationId {
    Text(String),
    Number(u64),
}

/// Zip codes sent as JSON numbers lose their leading zeros; restore them.
fn location_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawLocationId::deserialize(deserializer)? {
        RawLocationId::Text(text) => text,
        RawLocationId::Number(number) if number < 100_000 => format!("{number:05}"),
        RawLocationId::Number(number) => number.to_string(),
    })
}
