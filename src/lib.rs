//! `icepack` - ice weight estimation for perishable food shipments
//!
//! Forecasts the hottest temperature along a shipment's route over its
//! travel window, then interpolates an empirical food weight × temperature
//! table to recommend how much ice to pack.

pub mod api;
pub mod config;
pub mod error;
pub mod ice;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod shipment_service;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::IcepackConfig;
pub use error::IceError;
pub use ice::{IceEstimator, IceTable};
pub use location_resolver::{GeocodingLocationResolver, LocationResolver};
pub use models::{Location, LocationInput, Shipment, ShipmentRequest};
pub use shipment_service::ShipmentService;
pub use weather::{DarkSkyClient, ForecastProvider, TemperatureEstimate, WeatherEstimator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, IceError>;
