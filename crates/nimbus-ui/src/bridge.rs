//! Process-wide runtime and service wiring between config and the models.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use nimbus_core::{Config, ConfigError};
use nimbus_weather::{
    Coordinates, DisabledLocation, IpLocator, LocationProvider, NominatimGeocoder,
    OpenWeatherClient, RetryConfig, StaticLocation,
};
use tokio::runtime::Handle;

use crate::services::weather_service::WeatherService;

// Static tokio runtime that lives for the duration of the application
static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Initialize the tokio runtime (call once at application startup)
pub fn get_or_init_runtime() -> Result<Handle> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.handle().clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nimbus-tokio")
        .build()
        .context("Failed to create tokio runtime")?;

    // A concurrent initializer may have won; its runtime is the one kept
    let _ = RUNTIME.set(runtime);
    RUNTIME
        .get()
        .map(|r| r.handle().clone())
        .context("Tokio runtime not initialized")
}

/// Handle to the runtime, if initialized
pub fn get_runtime() -> Option<Handle> {
    RUNTIME.get().map(|r| r.handle().clone())
}

/// Pick the device location source the user configured
pub fn location_provider(config: &Config) -> Result<Arc<dyn LocationProvider>> {
    if let Some((latitude, longitude)) = config.location.fixed_coordinates() {
        tracing::info!("Using configured location");
        return Ok(Arc::new(StaticLocation::new(Coordinates::new(
            latitude, longitude,
        ))));
    }

    if config.location.allow_ip_lookup {
        tracing::info!("Locating device by IP address");
        let locator = IpLocator::new(
            &config.location.ip_lookup_url,
            Duration::from_secs(config.weather.request_timeout_secs),
        )
        .context("Failed to create IP locator")?;
        return Ok(Arc::new(locator));
    }

    tracing::warn!("No location source allowed; location requests will be denied");
    Ok(Arc::new(DisabledLocation))
}

/// Build the startup-sequence service from configuration
pub fn build_weather_service(config: &Config) -> Result<WeatherService> {
    let api_key = config
        .weather
        .api_key()
        .ok_or_else(|| ConfigError::MissingSetting("weather.api_key".to_string()))?;

    let timeout = Duration::from_secs(config.weather.request_timeout_secs);
    let retry = RetryConfig {
        max_retries: config.weather.max_retries,
        ..RetryConfig::default()
    };

    let geocoder = NominatimGeocoder::new(
        Some(&config.geocoding.base_url),
        &config.geocoding.user_agent,
        timeout,
        retry.clone(),
    )
    .context("Failed to create geocoding client")?;

    let weather = OpenWeatherClient::new(api_key, Some(&config.weather.base_url), timeout, retry)
        .context("Failed to create weather client")?;

    Ok(WeatherService::new(
        location_provider(config)?,
        Arc::new(geocoder),
        Arc::new(weather),
        config.weather.icon_base_url.clone(),
    ))
}
