use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use icepack::{
    DarkSkyClient, GeocodingLocationResolver, IceEstimator, IcepackConfig, ShipmentService,
    WeatherEstimator, logging, web,
};

/// Ice estimation API for perishable food shipments
#[derive(Parser)]
#[command(name = "icepack", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to ./icepack.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = IcepackConfig::load_from_path(cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    logging::init(&config.logging)?;

    let api_key = config.resolve_api_key()?;
    let table = config.ice_table();
    tracing::info!(
        weights = ?table.weights(),
        temperatures = ?table.temperatures(),
        "ice table loaded"
    );

    let weather_timeout = Duration::from_secs(config.weather.timeout_seconds.into());
    let forecasts = DarkSkyClient::new(&config.weather.base_url, api_key, weather_timeout)?;
    let resolver = GeocodingLocationResolver::new(
        &config.geocoding.base_url,
        Duration::from_secs(config.geocoding.timeout_seconds.into()),
    )?;

    let service = ShipmentService::new(
        Arc::new(resolver),
        WeatherEstimator::new(Arc::new(forecasts), weather_timeout)
            .with_default_temperature(config.weather.default_temperature_f),
        IceEstimator::new(Arc::new(table)),
    );

    web::run(&config.server, Arc::new(service)).await
}
