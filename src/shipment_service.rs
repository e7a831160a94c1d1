//! Shipment computation
//!
//! Validates a shipment request, resolves its route, estimates the worst-case
//! temperature and sizes the ice for it.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use tracing::{info, instrument};

use crate::IceError;
use crate::ice::IceEstimator;
use crate::location_resolver::LocationResolver;
use crate::models::{Shipment, ShipmentRequest};
use crate::weather::WeatherEstimator;

/// Computes shipments from requests
#[derive(Clone)]
pub struct ShipmentService {
    resolver: Arc<dyn LocationResolver>,
    weather: WeatherEstimator,
    ice: IceEstimator,
}

impl ShipmentService {
    pub fn new(resolver: Arc<dyn LocationResolver>, weather: WeatherEstimator, ice: IceEstimator) -> Self {
        Self {
            resolver,
            weather,
            ice,
        }
    }

    /// Produce a fully computed shipment.
    ///
    /// Malformed input and unknown locations are errors; an unavailable
    /// forecast is not, it yields a shipment flagged `temperature_degraded`.
    #[instrument(skip_all, fields(shipment = %request.shipment_id))]
    pub async fn compute(&self, request: ShipmentRequest) -> crate::Result<Shipment> {
        validate_food_weight(request.food_weight)?;
        let departure_date =
            parse_departure_date(request.departure_date.as_deref(), Local::now().date_naive())?;

        let (departure, destination) = futures::try_join!(
            self.resolver.resolve(&request.departure),
            self.resolver.resolve(&request.destination),
        )?;

        let estimate = self
            .weather
            .estimate(&departure, &destination, departure_date)
            .await;
        let temperature = round_to_tenth(estimate.temperature());
        let ice_weight = self.ice.estimate(temperature, request.food_weight);

        info!(
            %departure_date,
            temperature_f = temperature,
            degraded = estimate.is_degraded(),
            food_weight = request.food_weight,
            ice_weight,
            "shipment computed"
        );

        Ok(Shipment {
            shipment_id: request.shipment_id,
            departure: request.departure,
            destination: request.destination,
            departure_date,
            food_weight: request.food_weight,
            temperature,
            temperature_degraded: estimate.is_degraded(),
            degraded_reason: estimate.degraded_reason().map(str::to_string),
            ice_weight,
        })
    }
}

fn validate_food_weight(food_weight: f64) -> crate::Result<()> {
    if !food_weight.is_finite() || food_weight <= 0.0 {
        return Err(IceError::validation(format!(
            "food weight must be a positive number of pounds, got {food_weight}"
        )));
    }
    Ok(())
}

/// Parse the departure date, defaulting to `today` when absent or blank.
///
/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp (its own calendar date is
/// used) or `MM/DD/YYYY`.
pub fn parse_departure_date(input: Option<&str>, today: NaiveDate) -> crate::Result<NaiveDate> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(today);
    };

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| IceError::validation(format!("unrecognized departure date '{raw}'")))
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use crate::weather::{DailyForecast, ForecastProvider};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::time::Duration;

    struct CoordinatesOnly;

    #[async_trait]
    impl LocationResolver for CoordinatesOnly {
        async fn resolve(&self, location_id: &str) -> crate::Result<Location> {
            match location_id {
                "11201" => Ok(Location::new(40.69, -73.99, "11201")),
                "02134" => Ok(Location::new(42.35, -71.13, "02134")),
                other => Err(IceError::location_not_found(other)),
            }
        }
    }

    struct Constant(Option<f64>);

    #[async_trait]
    impl ForecastProvider for Constant {
        async fn daily_forecast(&self, _: &Location, _: NaiveDate) -> crate::Result<DailyForecast> {
            self.0
                .map(|t| DailyForecast {
                    max_temperature: t,
                    timezone: "America/New_York".to_string(),
                    max_temperature_at: None,
                })
                .ok_or_else(|| IceError::api("provider down"))
        }
    }

    fn service(temperature: Option<f64>) -> ShipmentService {
        ShipmentService::new(
            Arc::new(CoordinatesOnly),
            WeatherEstimator::new(Arc::new(Constant(temperature)), Duration::from_secs(5)),
            IceEstimator::default(),
        )
    }

    fn request(weight: f64, date: Option<&str>) -> ShipmentRequest {
        ShipmentRequest {
            shipment_id: "S-1".to_string(),
            departure: "11201".to_string(),
            destination: "02134".to_string(),
            departure_date: date.map(str::to_string),
            food_weight: weight,
        }
    }

    #[tokio::test]
    async fn test_compute_interpolated_shipment() {
        let shipment = service(Some(75.04)).compute(request(8.54, Some("2024-06-01"))).await.unwrap();

        assert_eq!(shipment.departure_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(shipment.temperature, 75.0);
        assert!(!shipment.temperature_degraded);
        assert_eq!(shipment.ice_weight, 4);
    }

    #[tokio::test]
    async fn test_compute_light_shipment_in_heat() {
        let shipment = service(Some(90.0)).compute(request(3.5, Some("2024-06-01"))).await.unwrap();
        assert_eq!(shipment.ice_weight, 8);
    }

    #[tokio::test]
    async fn test_provider_failure_marks_shipment_degraded() {
        let shipment = service(None).compute(request(3.5, Some("2024-06-01"))).await.unwrap();

        assert_eq!(shipment.temperature, 80.0);
        assert!(shipment.temperature_degraded);
        assert!(shipment.degraded_reason.unwrap().contains("provider down"));
        assert_eq!(shipment.ice_weight, 8);
    }

    #[tokio::test]
    async fn test_omitted_date_defaults_to_today() {
        let before = Local::now().date_naive();
        let shipment = service(Some(70.0)).compute(request(8.54, None)).await.unwrap();
        let after = Local::now().date_naive();

        assert!(shipment.departure_date == before || shipment.departure_date == after);
    }

    #[tokio::test]
    async fn test_unknown_location_stops_computation() {
        let mut req = request(8.54, None);
        req.destination = "99999".to_string();
        let err = service(Some(70.0)).compute(req).await.unwrap_err();
        assert!(matches!(err, IceError::LocationNotFound { .. }));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-2.5)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[tokio::test]
    async fn test_rejects_non_positive_weight(#[case] weight: f64) {
        let err = service(Some(70.0)).compute(request(weight, None)).await.unwrap_err();
        assert!(matches!(err, IceError::Validation { .. }));
    }

    #[rstest]
    #[case(None, "2024-01-15")]
    #[case(Some("   "), "2024-01-15")]
    #[case(Some("2024-06-01"), "2024-06-01")]
    #[case(Some("2024-06-01T23:30:00-05:00"), "2024-06-01")]
    #[case(Some("06/01/2024"), "2024-06-01")]
    fn test_parse_departure_date(#[case] input: Option<&str>, #[case] expected: &str) {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let parsed = parse_departure_date(input, today).unwrap();
        assert_eq!(parsed.to_string(), expected);
    }

    #[rstest]
    #[case("tomorrow")]
    #[case("2024-13-01")]
    #[case("2024-02-30")]
    fn test_parse_departure_date_rejects(#[case] input: &str) {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = parse_departure_date(Some(input), today).unwrap_err();
        assert!(matches!(err, IceError::Validation { .. }));
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(75.04), 75.0);
        assert_eq!(round_to_tenth(88.96), 89.0);
        assert_eq!(round_to_tenth(80.0), 80.0);
    }
}
