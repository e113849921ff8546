//! OpenWeatherMap One Call client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::instrument;

use crate::retry::{self, RetryConfig};
use crate::types::{Coordinates, OneCallResponse, WeatherError};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org";

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Current, hourly and daily weather for `coords`, metric units
    async fn fetch(&self, coords: Coordinates) -> Result<OneCallResponse, WeatherError>;
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

// The API key stays out of Debug output
impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherClient {
    pub fn new(
        api_key: &str,
        base_url: Option<&str>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(OPENWEATHER_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self, coords: Coordinates) -> Result<OneCallResponse, WeatherError> {
        let url = format!("{}/data/2.5/onecall", self.base_url);
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        let query = [
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("units", "metric"),
            ("exclude", "minutely"),
            ("appid", self.api_key.as_str()),
        ];

        let response = retry::with_retry(&self.retry, || {
            self.client.get(&url).query(&query).send()
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(WeatherError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(WeatherError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let data: OneCallResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        tracing::info!(
            "Fetched weather: {} hourly, {} daily entries",
            data.hourly.len(),
            data.daily.len()
        );
        Ok(data)
    }
}
