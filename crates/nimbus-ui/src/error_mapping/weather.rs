use nimbus_core::{
    AppError, LocationError as CoreLocationError, NetworkError, ReqwestErrorExt,
    WeatherError as CoreWeatherError,
};
use nimbus_weather::{GeocodeError, LocationError, WeatherError};

use crate::services::weather_service::PipelineError;

pub fn location_error(e: LocationError) -> AppError {
    match e {
        LocationError::ServiceUnavailable => AppError::Location(CoreLocationError::Unavailable(
            "location service unavailable".to_string(),
        )),
        LocationError::Network(e) => AppError::Network(e.into_network_error()),
        LocationError::Lookup(s) => AppError::Location(CoreLocationError::Unavailable(s)),
    }
}

pub fn geocode_error(e: GeocodeError) -> AppError {
    match e {
        GeocodeError::Network(e) => AppError::Network(e.into_network_error()),
        GeocodeError::Status(status) => AppError::Network(NetworkError::ServerError {
            status,
            message: "reverse geocoding failed".to_string(),
        }),
        GeocodeError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
    }
}

pub fn weather_error(e: WeatherError) -> AppError {
    match e {
        WeatherError::Network(e) => AppError::Network(e.into_network_error()),
        WeatherError::Unauthorized => AppError::Weather(CoreWeatherError::InvalidApiKey),
        WeatherError::RateLimited => AppError::Weather(CoreWeatherError::RateLimited),
        WeatherError::Status { status, .. } if status >= 500 => {
            AppError::Weather(CoreWeatherError::ServiceUnavailable)
        }
        WeatherError::Status { status, body } => {
            AppError::Weather(CoreWeatherError::ApiError(format!("{}: {}", status, body)))
        }
        WeatherError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::PermissionDenied => AppError::Location(CoreLocationError::PermissionDenied),
            PipelineError::FetchFailed { cause, .. } => cause,
            PipelineError::Cancelled => AppError::Service("startup sequence cancelled".to_string()),
        }
    }
}
