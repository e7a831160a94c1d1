//! Data models for the icepack service
//!
//! - Location: resolved coordinates and the identifiers that name them
//! - Shipment: inbound requests and computed shipments

pub mod location;
pub mod shipment;

pub use location::{Location, LocationInput};
pub use shipment::{Shipment, ShipmentRequest};
