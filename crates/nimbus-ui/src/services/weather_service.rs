//! Weather backend: the startup fetch sequence.
//! Runs off the UI thread; the result is sent back via mpsc.

use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use nimbus_core::{AppError, LocationError};
use nimbus_weather::{Location, LocationProvider, ReverseGeocoder, WeatherSource, WeatherView};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::error_mapping::weather as mapping;

/// Alert shown once when the user refuses location access
pub const PERMISSION_ALERT: &str = "Permission access was denied!";

/// Steps of the startup sequence that can fail after permission is granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Position,
    Geocode,
    Weather,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Position => write!(f, "position"),
            Stage::Geocode => write!(f, "geocode"),
            Stage::Weather => write!(f, "weather"),
        }
    }
}

/// Why the startup sequence stopped
#[derive(Debug)]
pub enum PipelineError {
    /// Foreground location permission refused. Terminal for the session.
    PermissionDenied,
    /// A provider call failed or returned something unusable
    FetchFailed { stage: Stage, cause: AppError },
    /// The owning model was torn down
    Cancelled,
}

impl PipelineError {
    pub fn fetch_failed(stage: Stage, cause: AppError) -> Self {
        PipelineError::FetchFailed { stage, cause }
    }

    /// Text for the error screen
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::PermissionDenied => LocationError::PermissionDenied.user_message(),
            PipelineError::FetchFailed { cause, .. } => cause.user_message(),
            PipelineError::Cancelled => "Cancelled.",
        }
    }

    /// Whether the error screen offers a retry
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::FetchFailed { cause, .. } => cause.is_retryable(),
            PipelineError::PermissionDenied | PipelineError::Cancelled => false,
        }
    }
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::PermissionDenied => write!(f, "Location permission denied"),
            PipelineError::FetchFailed { stage, cause } => {
                write!(f, "Fetch failed at {} stage: {}", stage, cause)
            }
            PipelineError::Cancelled => write!(f, "Startup sequence cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::FetchFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Messages sent from async operations back to the UI thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Result of the startup sequence
    FetchDone(Result<WeatherView, PipelineError>),
}

/// The three external collaborators plus what's needed to format their
/// output
pub struct WeatherService {
    location: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn WeatherSource>,
    icon_base_url: String,
}

impl WeatherService {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        weather: Arc<dyn WeatherSource>,
        icon_base_url: impl Into<String>,
    ) -> Self {
        Self {
            location,
            geocoder,
            weather,
            icon_base_url: icon_base_url.into(),
        }
    }

    /// Permission → position → city → weather → formatted view, in device
    /// local time.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<WeatherView, PipelineError> {
        self.run_in(cancel, &Local).await
    }

    /// [`run`](Self::run) with an explicit time zone for the formatted times
    pub async fn run_in<Tz>(
        &self,
        cancel: &CancellationToken,
        tz: &Tz,
    ) -> Result<WeatherView, PipelineError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        tracing::info!("Requesting location permission");
        let permission = guard(cancel, self.location.request_permission()).await?;
        if !permission.is_granted() {
            tracing::warn!("Location permission denied");
            return Err(PipelineError::PermissionDenied);
        }

        let coords = guard(cancel, self.location.current_position())
            .await?
            .map_err(|e| PipelineError::fetch_failed(Stage::Position, mapping::location_error(e)))?;
        tracing::info!("Got location: {:.4}, {:.4}", coords.latitude, coords.longitude);

        let results = guard(cancel, self.geocoder.reverse_geocode(coords))
            .await?
            .map_err(|e| PipelineError::fetch_failed(Stage::Geocode, mapping::geocode_error(e)))?;
        let city = results
            .into_iter()
            .next()
            .and_then(|result| result.city)
            .ok_or_else(|| {
                PipelineError::fetch_failed(
                    Stage::Geocode,
                    AppError::Location(LocationError::PlaceNotFound),
                )
            })?;
        tracing::info!("Location resolved to {}", city);

        let response = guard(cancel, self.weather.fetch(coords))
            .await?
            .map_err(|e| PipelineError::fetch_failed(Stage::Weather, mapping::weather_error(e)))?;
        let forecast = response
            .into_forecast()
            .map_err(|e| PipelineError::fetch_failed(Stage::Weather, mapping::weather_error(e)))?;

        let location = Location {
            coordinates: coords,
            city,
        };
        Ok(WeatherView::build(location, &forecast, &self.icon_base_url, tz))
    }
}

/// Await `work` unless `cancel` fires first
async fn guard<F: Future>(cancel: &CancellationToken, work: F) -> Result<F::Output, PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        output = work => Ok(output),
    }
}

/// Run the startup sequence on `runtime`.
/// Sends `FetchDone` on the channel when complete; nothing is sent if the
/// sequence was cancelled.
pub fn request_fetch(
    tx: &std::sync::mpsc::Sender<WeatherServiceMessage>,
    service: Arc<WeatherService>,
    runtime: &Handle,
    cancel: CancellationToken,
) {
    let tx = tx.clone();

    runtime.spawn(async move {
        let result = service.run(&cancel).await;

        if matches!(result, Err(PipelineError::Cancelled)) {
            tracing::debug!("Weather fetch cancelled");
            return;
        }
        if let Err(e) = &result {
            tracing::error!("Weather fetch failed: {}", e);
        }

        let _ = tx.send(WeatherServiceMessage::FetchDone(result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use nimbus_weather::{
        Coordinates, DayTemperatures, GeocodeError, GeocodeResult, OneCallCurrent, OneCallDay,
        OneCallHour, OneCallResponse, PermissionStatus, WeatherCondition, WeatherError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        position: AtomicUsize,
        geocode: AtomicUsize,
        weather: AtomicUsize,
    }

    struct FakeLocation {
        permission: PermissionStatus,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl LocationProvider for FakeLocation {
        async fn request_permission(&self) -> PermissionStatus {
            self.permission
        }

        async fn current_position(&self) -> Result<Coordinates, nimbus_weather::LocationError> {
            self.calls.position.fetch_add(1, Ordering::SeqCst);
            Ok(Coordinates::new(41.7151, 44.8271))
        }
    }

    struct FakeGeocoder {
        results: Vec<GeocodeResult>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        async fn reverse_geocode(
            &self,
            _coords: Coordinates,
        ) -> Result<Vec<GeocodeResult>, GeocodeError> {
            self.calls.geocode.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }
    }

    struct FakeWeather {
        fail: bool,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn fetch(&self, _coords: Coordinates) -> Result<OneCallResponse, WeatherError> {
            self.calls.weather.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WeatherError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            Ok(one_call(20, 10))
        }
    }

    fn icon(code: &str) -> Vec<WeatherCondition> {
        vec![WeatherCondition {
            icon: code.to_string(),
            description: None,
        }]
    }

    fn one_call(hours: i64, days: i64) -> OneCallResponse {
        OneCallResponse {
            current: OneCallCurrent {
                temp: 21.9,
                sunrise: 6 * 3600 + 5 * 60,
                sunset: 20 * 3600,
                weather: icon("01d"),
            },
            hourly: (0..hours)
                .map(|i| OneCallHour {
                    dt: i * 3600,
                    temp: 21.6,
                    weather: icon("02d"),
                })
                .collect(),
            daily: (0..days)
                .map(|i| OneCallDay {
                    dt: i * 86_400,
                    temp: DayTemperatures { day: 15.0 },
                    weather: icon("10d"),
                })
                .collect(),
        }
    }

    fn tbilisi() -> Vec<GeocodeResult> {
        vec![GeocodeResult {
            city: Some("Tbilisi".to_string()),
            country: Some("Georgia".to_string()),
        }]
    }

    fn service(
        permission: PermissionStatus,
        results: Vec<GeocodeResult>,
        weather_fails: bool,
    ) -> (WeatherService, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let service = WeatherService::new(
            Arc::new(FakeLocation {
                permission,
                calls: calls.clone(),
            }),
            Arc::new(FakeGeocoder {
                results,
                calls: calls.clone(),
            }),
            Arc::new(FakeWeather {
                fail: weather_fails,
                calls: calls.clone(),
            }),
            "http://openweathermap.org/img/wn",
        );
        (service, calls)
    }

    #[tokio::test]
    async fn test_denied_permission_stops_before_any_provider() {
        let (service, calls) = service(PermissionStatus::Denied, tbilisi(), false);
        let result = service.run_in(&CancellationToken::new(), &Utc).await;

        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::PermissionDenied));
        assert_eq!(err.user_message(), "Permission denied!");
        assert!(!err.is_retryable());
        assert_eq!(calls.position.load(Ordering::SeqCst), 0);
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 0);
        assert_eq!(calls.weather.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_chain_builds_windowed_view() {
        let (service, calls) = service(PermissionStatus::Granted, tbilisi(), false);
        let view = service.run_in(&CancellationToken::new(), &Utc).await.unwrap();

        assert_eq!(view.location.city, "Tbilisi");
        assert_eq!(view.current.temperature_label, "21°");
        assert_eq!(view.current.sunrise, "06:05");
        assert_eq!(view.current.sunset, "20:00");
        assert_eq!(view.hourly.len(), 12);
        assert_eq!(view.hourly[0].label, "00:00");
        assert_eq!(view.hourly[11].label, "11:00");
        assert_eq!(view.hourly[0].temperature, "22°");
        assert_eq!(view.daily.len(), 7);
        assert_eq!(calls.position.load(Ordering::SeqCst), 1);
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 1);
        assert_eq!(calls.weather.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_geocode_results_fail_at_geocode_stage() {
        let (service, calls) = service(PermissionStatus::Granted, Vec::new(), false);
        let err = service
            .run_in(&CancellationToken::new(), &Utc)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::FetchFailed {
                stage: Stage::Geocode,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(calls.weather.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_result_without_city_fails() {
        let results = vec![
            GeocodeResult::default(),
            GeocodeResult {
                city: Some("Rustavi".to_string()),
                country: None,
            },
        ];
        let (service, _) = service(PermissionStatus::Granted, results, false);
        let err = service
            .run_in(&CancellationToken::new(), &Utc)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FetchFailed {
                stage: Stage::Geocode,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_weather_failure_is_fetch_failed_at_weather_stage() {
        let (service, _) = service(PermissionStatus::Granted, tbilisi(), true);
        let err = service
            .run_in(&CancellationToken::new(), &Utc)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::FetchFailed {
                stage: Stage::Weather,
                ..
            }
        ));
        assert!(err.to_string().contains("weather stage"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_sequence() {
        let (service, calls) = service(PermissionStatus::Granted, tbilisi(), false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.run_in(&cancel, &Utc).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(calls.position.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_fetch_reports_over_channel() {
        let (service, _) = service(PermissionStatus::Denied, tbilisi(), false);
        let (tx, rx) = std::sync::mpsc::channel();

        request_fetch(&tx, Arc::new(service), &Handle::current(), CancellationToken::new());

        let message = tokio::task::spawn_blocking(move || rx.recv()).await.unwrap().unwrap();
        let WeatherServiceMessage::FetchDone(result) = message;
        assert!(matches!(result, Err(PipelineError::PermissionDenied)));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Position.to_string(), "position");
        assert_eq!(Stage::Geocode.to_string(), "geocode");
        assert_eq!(Stage::Weather.to_string(), "weather");
    }
}
