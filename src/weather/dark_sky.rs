//! Client for Dark Sky compatible forecast APIs
//!
//! Uses the time machine form `/forecast/{key}/{lat},{lon},{time}` and reads
//! the first entry of the daily block. Pirate Weather serves the same
//! interface and is the default endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{DailyForecast, ForecastProvider};
use crate::IceError;
use crate::models::Location;

const EXCLUDED_BLOCKS: &str = "currently,minutely,hourly,alerts,flags";

/// Keyed forecast client
#[derive(Debug, Clone)]
pub struct DarkSkyClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl DarkSkyClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icepack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IceError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn request_url(&self, location: &Location, time: i64) -> String {
        format!(
            "{}/{}/{},{},{}?units=us&exclude={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            location.latitude,
            location.longitude,
            time,
            EXCLUDED_BLOCKS
        )
    }

    fn redact(&self, url: &str) -> String {
        url.replace(urlencoding::encode(&self.api_key).as_ref(), "***")
    }
}

/// UNIX timestamp for noon UTC of `date`.
///
/// Noon UTC falls on the same calendar day in every US time zone, so the
/// provider returns the daily block for `date` at the queried location.
#[must_use]
pub fn unix_time_for(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp() + 12 * 60 * 60
}

#[async_trait]
impl ForecastProvider for DarkSkyClient {
    #[instrument(skip(self, location), fields(location = %location.id))]
    async fn daily_forecast(&self, location: &Location, date: NaiveDate) -> crate::Result<DailyForecast> {
        let url = self.request_url(location, unix_time_for(date));
        debug!("Forecast request URL: {}", self.redact(&url));
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                IceError::timeout(format!("forecast for {}", location.id), self.timeout.as_secs())
            } else {
                IceError::api(format!("forecast request failed: {}", self.redact(&e.to_string())))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(IceError::api(format!(
                "forecast provider returned {status} for {}: {snippet}",
                location.id
            )));
        }

        let payload: ForecastResponse = response
            .json()
            .await
            .map_err(|e| IceError::api(format!("Failed to parse forecast response: {e}")))?;

        let elapsed = start_time.elapsed();
        if elapsed.as_secs() > 5 {
            warn!("Slow forecast response: {:.3}s", elapsed.as_secs_f64());
        }

        payload.into_daily_forecast()
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timezone: String,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    data: Vec<DailyDataPoint>,
}

#[derive(Debug, Deserialize)]
struct DailyDataPoint {
    #[serde(rename = "temperatureMax")]
    temperature_max: Option<f64>,
    #[serde(rename = "temperatureMaxTime")]
    temperature_max_time: Option<i64>,
}

impl ForecastResponse {
    fn into_daily_forecast(self) -> crate::Result<DailyForecast> {
        let day = self
            .daily
            .and_then(|daily| daily.data.into_iter().next())
            .ok_or_else(|| IceError::api("forecast response has no daily data"))?;

        let max_temperature = day
            .temperature_max
            .filter(|t| t.is_finite())
            .ok_or_else(|| IceError::api("forecast response has no daily temperatureMax"))?;

        let max_temperature_at = match self.timezone.parse::<Tz>() {
            Ok(tz) => day
                .temperature_max_time
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|utc| utc.with_timezone(&tz)),
            Err(_) => {
                debug!("Unknown forecast timezone '{}'", self.timezone);
                None
            }
        };

        Ok(DailyForecast {
            max_temperature,
            timezone: self.timezone,
            max_temperature_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn parse(body: &str) -> crate::Result<DailyForecast> {
        serde_json::from_str::<ForecastResponse>(body)
            .unwrap()
            .into_daily_forecast()
    }

    #[test]
    fn test_reads_first_daily_entry() {
        let forecast = parse(
            r#"{
                "latitude": 40.69, "longitude": -73.99,
                "timezone": "America/New_York",
                "daily": {"data": [
                    {"time": 1717214400, "temperatureMax": 78.4, "temperatureMaxTime": 1717269600},
                    {"time": 1717300800, "temperatureMax": 91.0}
                ]}
            }"#,
        )
        .unwrap();

        assert_eq!(forecast.max_temperature, 78.4);
        assert_eq!(forecast.timezone, "America/New_York");
        // 1717269600 is 2024-06-01T19:20:00Z, 15:20 in New York (EDT)
        let at = forecast.max_temperature_at.unwrap();
        assert_eq!(at.hour(), 15);
        assert_eq!(at.minute(), 20);
    }

    #[test]
    fn test_unknown_timezone_keeps_temperature() {
        let forecast = parse(
            r#"{"timezone": "Mars/Olympus", "daily": {"data": [{"temperatureMax": 60.0, "temperatureMaxTime": 1717269600}]}}"#,
        )
        .unwrap();
        assert_eq!(forecast.max_temperature, 60.0);
        assert!(forecast.max_temperature_at.is_none());
    }

    #[test]
    fn test_missing_daily_block_is_an_error() {
        let err = parse(r#"{"timezone": "America/Chicago"}"#).unwrap_err();
        assert!(matches!(err, IceError::Api { .. }));

        let err = parse(r#"{"timezone": "America/Chicago", "daily": {"data": []}}"#).unwrap_err();
        assert!(err.to_string().contains("no daily data"));

        let err = parse(r#"{"timezone": "America/Chicago", "daily": {"data": [{"time": 1}]}}"#).unwrap_err();
        assert!(err.to_string().contains("temperatureMax"));
    }

    #[test]
    fn test_unix_time_is_noon_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(unix_time_for(date), 1_717_243_200);
    }

    #[test]
    fn test_request_url_hides_key_in_logs() {
        let client = DarkSkyClient::new(
            "https://api.pirateweather.net/forecast/",
            "secret-key-123",
            Duration::from_secs(5),
        )
        .unwrap();
        let location = Location::new(40.5, -73.25, "11201");
        let url = client.request_url(&location, 1_717_243_200);

        assert_eq!(
            url,
            "https://api.pirateweather.net/forecast/secret-key-123/40.5,-73.25,1717243200?units=us&exclude=currently,minutely,hourly,alerts,flags"
        );
        assert!(!client.redact(&url).contains("secret-key-123"));
    }
}
