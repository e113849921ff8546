//! Reverse geocoding: convert coordinates to a city name.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::retry::{self, RetryConfig};
use crate::types::{Coordinates, GeocodeError, GeocodeResult};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Matches are ordered best first. An empty list means nothing was found.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Vec<GeocodeResult>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    /// Set instead of `address` when nothing is at the point
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for GeocodeResult {
    fn from(addr: NominatimAddress) -> Self {
        // Prefer city > town > village > municipality
        let city = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .or(addr.municipality);
        Self {
            city,
            country: addr.country,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: Option<&str>,
        user_agent: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(NOMINATIM_URL)
                .trim_end_matches('/')
                .to_string(),
            retry,
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    #[instrument(skip(self), level = "info")]
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        let query = [
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "json"),
            ("addressdetails", "1"),
            ("zoom", "10"),
        ];

        let response = retry::with_retry(&self.retry, || {
            self.client.get(&url).query(&query).send()
        })
        .await?;

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        if let Some(err) = body.error {
            tracing::debug!("Reverse geocode found nothing: {}", err);
            return Ok(Vec::new());
        }

        let results: Vec<GeocodeResult> = body.address.into_iter().map(GeocodeResult::from).collect();
        if let Some(city) = results.first().and_then(|r| r.city.as_deref()) {
            tracing::info!("Reverse geocoded to: {}", city);
        }
        Ok(results)
    }
}
