//! Integration tests for the icepack service
//!
//! A local axum server stands in for the forecast and geocoding providers so
//! the real HTTP clients are exercised end to end.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde_json::json;

use icepack::weather::dark_sky::unix_time_for;
use icepack::{
    DarkSkyClient, GeocodingLocationResolver, IceError, IceEstimator, LocationResolver,
    ShipmentRequest, ShipmentService, WeatherEstimator,
};

const API_KEY: &str = "integration-key";

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

/// Daily maxima served by the fake provider, keyed by rounded latitude and time
fn forecast_table() -> HashMap<(i64, i64), f64> {
    HashMap::from([
        ((40, unix_time_for(june(1))), 72.0),
        ((40, unix_time_for(june(2))), 74.5),
        ((42, unix_time_for(june(1))), 78.0),
        ((42, unix_time_for(june(2))), 90.04),
    ])
}

async fn forecast(Path((key, point)): Path<(String, String)>) -> impl IntoResponse {
    if key != API_KEY {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "bad key"})));
    }
    let parts: Vec<f64> = point.split(',').filter_map(|p| p.parse().ok()).collect();
    let (lat, time) = (parts[0].floor() as i64, parts[2] as i64);
    match forecast_table().get(&(lat, time)) {
        Some(max) => (
            StatusCode::OK,
            Json(json!({
                "latitude": parts[0],
                "longitude": parts[1],
                "timezone": "America/New_York",
                "daily": {"data": [{"time": time, "temperatureMax": max, "temperatureMaxTime": time + 3600}]}
            })),
        ),
        None => (StatusCode::OK, Json(json!({"timezone": "America/New_York"}))),
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    match params.get("name").map(String::as_str) {
        Some("11201") => Json(json!({"results": [{
            "name": "Brooklyn", "latitude": 40.69, "longitude": -73.99,
            "country_code": "US", "admin1": "New York", "postcodes": ["11201"]
        }]})),
        _ => Json(json!({"generationtime_ms": 0.1})),
    }
}

async fn spawn_fake_providers() -> SocketAddr {
    let app = Router::new()
        .route("/forecast/{key}/{point}", get(forecast))
        .route("/v1/search", get(search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn service(addr: SocketAddr, key: &str) -> ShipmentService {
    let timeout = Duration::from_secs(5);
    let forecasts =
        DarkSkyClient::new(format!("http://{addr}/forecast"), key, timeout).unwrap();
    let resolver = GeocodingLocationResolver::new(format!("http://{addr}/v1"), timeout).unwrap();
    ShipmentService::new(
        Arc::new(resolver),
        WeatherEstimator::new(Arc::new(forecasts), timeout),
        IceEstimator::default(),
    )
}

fn request(departure: &str, destination: &str, weight: f64) -> ShipmentRequest {
    ShipmentRequest {
        shipment_id: "INT-1".to_string(),
        departure: departure.to_string(),
        destination: destination.to_string(),
        departure_date: Some("2024-06-01".to_string()),
        food_weight: weight,
    }
}

#[tokio::test]
async fn test_shipment_uses_hottest_forecast_on_route() {
    let addr = spawn_fake_providers().await;
    let shipment = service(addr, API_KEY)
        .compute(request("11201", "42.36,-71.06", 3.5))
        .await
        .unwrap();

    assert_eq!(shipment.temperature, 90.0);
    assert!(!shipment.temperature_degraded);
    assert_eq!(shipment.ice_weight, 8);
    assert_eq!(shipment.departure_date, june(1));
}

#[tokio::test]
async fn test_shipment_between_cool_points() {
    let addr = spawn_fake_providers().await;
    // Only the Brooklyn end: maxima 72.0 and 74.5
    let shipment = service(addr, API_KEY)
        .compute(request("11201", "40.70,-73.95", 8.54))
        .await
        .unwrap();

    assert_eq!(shipment.temperature, 74.5);
    assert_eq!(shipment.ice_weight, 4);
}

#[tokio::test]
async fn test_rejected_key_degrades_to_default() {
    let addr = spawn_fake_providers().await;
    let shipment = service(addr, "wrong-key")
        .compute(request("11201", "42.36,-71.06", 3.5))
        .await
        .unwrap();

    assert_eq!(shipment.temperature, 80.0);
    assert!(shipment.temperature_degraded);
    assert!(shipment.degraded_reason.unwrap().contains("403"));
    assert_eq!(shipment.ice_weight, 8);
}

#[tokio::test]
async fn test_missing_daily_data_degrades_to_default() {
    let addr = spawn_fake_providers().await;
    // Latitude 35 has no scripted forecast, so the provider omits the daily block
    let shipment = service(addr, API_KEY)
        .compute(request("11201", "35.0,-80.0", 8.54))
        .await
        .unwrap();

    assert!(shipment.temperature_degraded);
    assert_eq!(shipment.temperature, 80.0);
}

#[tokio::test]
async fn test_unreachable_provider_degrades_to_default() {
    let addr = spawn_fake_providers().await;
    let timeout = Duration::from_secs(2);
    let forecasts = DarkSkyClient::new("http://127.0.0.1:9/forecast", API_KEY, timeout).unwrap();
    let resolver = GeocodingLocationResolver::new(format!("http://{addr}/v1"), timeout).unwrap();
    let service = ShipmentService::new(
        Arc::new(resolver),
        WeatherEstimator::new(Arc::new(forecasts), timeout),
        IceEstimator::default(),
    );

    let shipment = service
        .compute(request("11201", "42.36,-71.06", 14.35))
        .await
        .unwrap();

    assert!(shipment.temperature_degraded);
    assert_eq!(shipment.ice_weight, 4);
}

#[tokio::test]
async fn test_unknown_zip_code_is_not_found() {
    let addr = spawn_fake_providers().await;
    let resolver =
        GeocodingLocationResolver::new(format!("http://{addr}/v1"), Duration::from_secs(5)).unwrap();

    let err = resolver.resolve("00000").await.unwrap_err();
    assert!(matches!(err, IceError::LocationNotFound { .. }));

    let found = resolver.resolve("11201").await.unwrap();
    assert_eq!(found.name.as_deref(), Some("Brooklyn, New York"));
}
