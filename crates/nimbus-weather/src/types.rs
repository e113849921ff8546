use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of hourly entries shown in the "today" view
pub const HOURLY_WINDOW: usize = 12;

/// Number of daily entries shown in the "week" view
pub const DAILY_WINDOW: usize = 7;

/// Geographic position of the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Answer to a foreground location permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Where the forecast is for. Set once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    pub city: String,
}

/// One reverse geocoding match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub city: Option<String>,
    pub country: Option<String>,
}

// --- One Call wire format ------------------------------------------------

/// `GET /data/2.5/onecall` response, minus the fields we never read
#[derive(Debug, Clone, Deserialize)]
pub struct OneCallResponse {
    pub current: OneCallCurrent,
    #[serde(default)]
    pub hourly: Vec<OneCallHour>,
    #[serde(default)]
    pub daily: Vec<OneCallDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneCallCurrent {
    pub temp: f64,
    pub sunrise: i64,
    pub sunset: i64,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneCallHour {
    pub dt: i64,
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneCallDay {
    pub dt: i64,
    pub temp: DayTemperatures,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayTemperatures {
    pub day: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub icon: String,
    #[serde(default)]
    pub description: Option<String>,
}

// --- Domain --------------------------------------------------------------

/// Current conditions, before formatting
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub icon: String,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyEntry {
    pub time: DateTime<Utc>,
    pub icon: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyEntry {
    pub time: DateTime<Utc>,
    pub icon: String,
    /// Daytime temperature (`temp.day`)
    pub temperature: f64,
}

/// A provider response cut down to the forecast windows
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub current: CurrentWeather,
    pub hourly: Vec<HourlyEntry>,
    pub daily: Vec<DailyEntry>,
}

impl OneCallResponse {
    /// Validate the response and keep the first `HOURLY_WINDOW` hours and
    /// `DAILY_WINDOW` days, in provider order.
    pub fn into_forecast(self) -> Result<Forecast, WeatherError> {
        let current = CurrentWeather {
            temperature: self.current.temp,
            icon: primary_icon(&self.current.weather, "current")?,
            sunrise: timestamp(self.current.sunrise, "current.sunrise")?,
            sunset: timestamp(self.current.sunset, "current.sunset")?,
        };

        let hourly = self
            .hourly
            .into_iter()
            .take(HOURLY_WINDOW)
            .map(|hour| {
                Ok(HourlyEntry {
                    time: timestamp(hour.dt, "hourly.dt")?,
                    icon: primary_icon(&hour.weather, "hourly")?,
                    temperature: hour.temp,
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        let daily = self
            .daily
            .into_iter()
            .take(DAILY_WINDOW)
            .map(|day| {
                Ok(DailyEntry {
                    time: timestamp(day.dt, "daily.dt")?,
                    icon: primary_icon(&day.weather, "daily")?,
                    temperature: day.temp.day,
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        Ok(Forecast {
            current,
            hourly,
            daily,
        })
    }
}

fn primary_icon(conditions: &[WeatherCondition], field: &str) -> Result<String, WeatherError> {
    conditions
        .first()
        .map(|c| c.icon.clone())
        .ok_or_else(|| WeatherError::Parse(format!("{field} has no weather entry")))
}

fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| WeatherError::Parse(format!("{field} out of range: {secs}")))
}

// --- Errors --------------------------------------------------------------

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Location lookup failed: {0}")]
    Lookup(String),
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoder returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid API key")]
    Unauthorized,
    #[error("Rate limited")]
    RateLimited,
    #[error("Weather API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(icon: &str) -> WeatherCondition {
        WeatherCondition {
            icon: icon.to_string(),
            description: None,
        }
    }

    fn response(hours: usize, days: usize) -> OneCallResponse {
        OneCallResponse {
            current: OneCallCurrent {
                temp: 21.9,
                sunrise: 1_700_000_000,
                sunset: 1_700_040_000,
                weather: vec![condition("01d"), condition("02d")],
            },
            hourly: (0..hours)
                .map(|i| OneCallHour {
                    dt: 1_700_000_000 + i as i64 * 3600,
                    temp: i as f64,
                    weather: vec![condition("03d")],
                })
                .collect(),
            daily: (0..days)
                .map(|i| OneCallDay {
                    dt: 1_700_000_000 + i as i64 * 86_400,
                    temp: DayTemperatures { day: 10.0 + i as f64 },
                    weather: vec![condition("10d")],
                })
                .collect(),
        }
    }

    #[test]
    fn test_hourly_window_keeps_first_twelve_in_order() {
        let forecast = response(20, 0).into_forecast().unwrap();
        assert_eq!(forecast.hourly.len(), HOURLY_WINDOW);
        for (i, hour) in forecast.hourly.iter().enumerate() {
            assert_eq!(hour.temperature, i as f64);
        }
    }

    #[test]
    fn test_daily_window_keeps_first_seven_in_order() {
        let forecast = response(0, 10).into_forecast().unwrap();
        assert_eq!(forecast.daily.len(), DAILY_WINDOW);
        assert_eq!(forecast.daily[0].temperature, 10.0);
        assert_eq!(forecast.daily[6].temperature, 16.0);
        assert!(forecast.daily.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_short_sequences_are_not_padded() {
        let forecast = response(3, 2).into_forecast().unwrap();
        assert_eq!(forecast.hourly.len(), 3);
        assert_eq!(forecast.daily.len(), 2);
    }

    #[test]
    fn test_primary_icon_is_first_condition() {
        let forecast = response(1, 1).into_forecast().unwrap();
        assert_eq!(forecast.current.icon, "01d");
    }

    #[test]
    fn test_missing_current_weather_is_parse_error() {
        let mut resp = response(1, 1);
        resp.current.weather.clear();
        assert!(matches!(resp.into_forecast(), Err(WeatherError::Parse(_))));
    }

    #[test]
    fn test_hours_past_window_are_not_validated() {
        let mut resp = response(13, 0);
        resp.hourly[12].weather.clear();
        assert!(resp.into_forecast().is_ok());
    }

    #[test]
    fn test_deserialize_minimal_one_call() {
        let json = serde_json::json!({
            "lat": 41.7, "lon": 44.8, "timezone": "Asia/Tbilisi",
            "current": {
                "dt": 1_700_000_000, "temp": 5.2,
                "sunrise": 1_699_990_000, "sunset": 1_700_030_000,
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01n"}]
            },
            "hourly": [{"dt": 1_700_000_000, "temp": 5.0, "weather": [{"icon": "01n"}]}],
            "daily": [{"dt": 1_700_000_000, "temp": {"day": 9.1, "min": 2.0}, "weather": [{"icon": "02d"}]}]
        });
        let resp: OneCallResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.current.weather[0].icon, "01n");
        assert_eq!(resp.daily[0].temp.day, 9.1);
    }
}
