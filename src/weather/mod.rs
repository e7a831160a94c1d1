//! Route temperature estimation
//!
//! A shipment is exposed to the weather at both ends of its route on both the
//! departure day and the arrival day. The estimator asks the forecast
//! provider for all four combinations and sizes ice for the hottest one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::IceError;
use crate::models::Location;

pub mod dark_sky;

pub use dark_sky::DarkSkyClient;

/// Temperature assumed for a route when the forecast cannot be obtained
pub const DEFAULT_TEMPERATURE_F: f64 = 80.0;

/// Daily forecast for one location and calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    /// Maximum temperature in °F
    pub max_temperature: f64,
    /// IANA timezone of the location
    pub timezone: String,
    /// Local time at which the maximum is expected
    pub max_temperature_at: Option<DateTime<Tz>>,
}

/// Source of daily maximum temperatures
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn daily_forecast(&self, location: &Location, date: NaiveDate) -> crate::Result<DailyForecast>;
}

/// One (location, date) request to the forecast provider
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub location: Location,
    pub date: NaiveDate,
}

/// Worst-case route temperature, and whether it came from a real forecast
#[derive(Debug, Clone, PartialEq)]
pub enum TemperatureEstimate {
    Observed(f64),
    /// Fallback default used because the forecast was unavailable
    Degraded { temperature: f64, reason: String },
}

impl TemperatureEstimate {
    #[must_use]
    pub fn temperature(&self) -> f64 {
        match self {
            Self::Observed(temperature) | Self::Degraded { temperature, .. } => *temperature,
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Observed(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// The four queries covering both route ends on the departure and arrival days.
///
/// Returns `None` when the arrival day is not representable.
#[must_use]
pub fn forecast_queries(
    departure: &Location,
    destination: &Location,
    departure_date: NaiveDate,
) -> Option<[ForecastQuery; 4]> {
    let arrival_date = departure_date.checked_add_days(Days::new(1))?;
    let query = |location: &Location, date| ForecastQuery {
        location: location.clone(),
        date,
    };
    Some([
        query(departure, departure_date),
        query(departure, arrival_date),
        query(destination, departure_date),
        query(destination, arrival_date),
    ])
}

/// Estimates the hottest temperature a shipment will see in transit
#[derive(Clone)]
pub struct WeatherEstimator {
    provider: Arc<dyn ForecastProvider>,
    query_timeout: Duration,
    default_temperature: f64,
}

impl WeatherEstimator {
    pub fn new(provider: Arc<dyn ForecastProvider>, query_timeout: Duration) -> Self {
        Self {
            provider,
            query_timeout,
            default_temperature: DEFAULT_TEMPERATURE_F,
        }
    }

    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f64) -> Self {
        self.default_temperature = temperature;
        self
    }

    /// Maximum forecast temperature over both locations and both travel days.
    ///
    /// Never fails: if any query fails or times out the configured default is
    /// returned as [`TemperatureEstimate::Degraded`].
    #[instrument(skip_all, fields(departure = %departure.id, destination = %destination.id, departure_date = %departure_date))]
    pub async fn estimate(
        &self,
        departure: &Location,
        destination: &Location,
        departure_date: NaiveDate,
    ) -> TemperatureEstimate {
        let Some(queries) = forecast_queries(departure, destination, departure_date) else {
            return self.degraded(format!("no arrival day after {departure_date}"));
        };

        let forecasts = futures::future::try_join_all(queries.iter().map(|q| self.fetch(q))).await;

        match forecasts {
            Ok(temperatures) => {
                let hottest = temperatures.into_iter().fold(f64::NEG_INFINITY, f64::max);
                info!(temperature_f = hottest, "route temperature estimated");
                TemperatureEstimate::Observed(hottest)
            }
            Err(e) => self.degraded(e.to_string()),
        }
    }

    async fn fetch(&self, query: &ForecastQuery) -> crate::Result<f64> {
        let forecast = tokio::time::timeout(
            self.query_timeout,
            self.provider.daily_forecast(&query.location, query.date),
        )
        .await
        .map_err(|_| {
            IceError::timeout(
                format!("forecast for {} on {}", query.location.id, query.date),
                self.query_timeout.as_secs(),
            )
        })??;

        debug!(
            location = %query.location.id,
            date = %query.date,
            max_temperature = forecast.max_temperature,
            max_at = ?forecast.max_temperature_at,
            "forecast received"
        );
        Ok(forecast.max_temperature)
    }

    fn degraded(&self, reason: String) -> TemperatureEstimate {
        warn!(
            default_temperature_f = self.default_temperature,
            %reason,
            "weather forecast unavailable, using default temperature"
        );
        TemperatureEstimate::Degraded {
            temperature: self.default_temperature,
            reason,
        }
    }
}
