//! Device location providers.
//!
//! A provider answers the foreground permission request and then reports
//! the current position. Callers must not ask for a position after a
//! denial.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::types::{Coordinates, LocationError, PermissionStatus};

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Position fixed in configuration. Always granted.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    coordinates: Coordinates,
}

impl StaticLocation {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates)
    }
}

/// No location source available or allowed. Every request is denied.
#[derive(Debug, Clone, Default)]
pub struct DisabledLocation;

#[async_trait]
impl LocationProvider for DisabledLocation {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Denied
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// ip-api.com style `{"status": "success", "lat": .., "lon": ..}`
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximate the device position from its public IP address. Only
/// constructed when the user allowed IP lookups, so permission is granted.
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

impl IpLocator {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LocationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    #[instrument(skip(self), level = "debug")]
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(LocationError::Lookup(format!(
                "lookup returned status {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response.json().await?;
        if body.status != "success" {
            return Err(LocationError::Lookup(
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) => {
                tracing::info!("Located device by IP: {:.2}, {:.2}", latitude, longitude);
                Ok(Coordinates::new(latitude, longitude))
            }
            _ => Err(LocationError::Lookup("response has no coordinates".to_string())),
        }
    }
}
