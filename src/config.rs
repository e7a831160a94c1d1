//! Configuration management for the icepack service
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and validates all settings before the server starts.

use crate::IceError;
use crate::ice::IceTable;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for the icepack service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IcepackConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Forecast provider configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Zip code geocoding configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Replacement ice table; the empirical table is used when absent
    #[serde(default)]
    pub ice_table: Option<IceTable>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
}

/// Forecast API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast API key; read from `api_key_file` when unset
    pub api_key: Option<String>,
    /// File whose last whitespace-separated token is the API key
    #[serde(default = "default_api_key_file")]
    pub api_key_file: PathBuf,
    /// Base URL of the Dark Sky compatible forecast endpoint
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Per-query timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Temperature (°F) assumed when forecasts are unavailable
    #[serde(default = "default_temperature")]
    pub default_temperature_f: f64,
}

/// Geocoding API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_request_timeout() -> u32 {
    30
}

fn default_api_key_file() -> PathBuf {
    PathBuf::from("dark-sky-key.txt")
}

fn default_weather_base_url() -> String {
    "https://api.pirateweather.net/forecast".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_temperature() -> f64 {
    crate::weather::DEFAULT_TEMPERATURE_F
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_file: default_api_key_file(),
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            default_temperature_f: default_temperature(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl IcepackConfig {
    /// Load configuration from `icepack.toml` and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Environment variables prefixed `ICEPACK_` override the file, with `__`
    /// between nested keys (`ICEPACK_WEATHER__API_KEY`).
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("icepack.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ICEPACK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: IcepackConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration from {}", config_file.display()))?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_weather_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 120 {
            return Err(IceError::config("Weather API timeout cannot exceed 120 seconds").into());
        }

        if self.geocoding.timeout_seconds > 120 {
            return Err(IceError::config("Geocoding timeout cannot exceed 120 seconds").into());
        }

        if self.server.request_timeout_seconds > 300 {
            return Err(IceError::config("Request timeout cannot exceed 300 seconds").into());
        }

        if !self.weather.default_temperature_f.is_finite() {
            return Err(IceError::config("Default temperature must be a finite number").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(IceError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(IceError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather API", &self.weather.base_url),
            ("Geocoding", &self.geocoding.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(IceError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// The forecast API key, from the config itself or the key file.
    ///
    /// The service cannot start without it.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.weather.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        read_api_key_file(&self.weather.api_key_file).with_context(|| {
            format!(
                "No weather API key: set weather.api_key, ICEPACK_WEATHER__API_KEY, or create {}",
                self.weather.api_key_file.display()
            )
        })
    }

    /// The configured ice table, or the empirical one
    #[must_use]
    pub fn ice_table(&self) -> IceTable {
        self.ice_table.clone().unwrap_or_else(IceTable::empirical)
    }
}

/// Read a key file; the key is its last whitespace-separated token.
fn read_api_key_file(path: &Path) -> crate::Result<String> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| IceError::config(format!("API key file {} is empty", path.display())))
}
