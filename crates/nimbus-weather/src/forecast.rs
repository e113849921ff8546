//! Presentation-ready weather: every string the screen shows, derived once.

use chrono::TimeZone;
use serde::Serialize;
use std::fmt::Display;

use crate::format::{self, IconSize};
use crate::types::{Forecast, Location};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    /// Floored, e.g. `21°`
    pub temperature_label: String,
    pub icon: String,
    pub icon_url: String,
    pub sunrise: String,
    pub sunset: String,
}

/// One entry of the hourly or daily strip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTile {
    /// `HH:MM` for hours, `Mon` for days
    pub label: String,
    pub icon_url: String,
    /// Rounded, e.g. `22°`
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub location: Location,
    pub current: CurrentConditions,
    pub hourly: Vec<ForecastTile>,
    pub daily: Vec<ForecastTile>,
}

impl WeatherView {
    /// Format `forecast` for display in `tz`. Production passes
    /// `chrono::Local`.
    pub fn build<Tz>(location: Location, forecast: &Forecast, icon_base: &str, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let current = CurrentConditions {
            temperature_label: format::degrees(format::floor_temperature(
                forecast.current.temperature,
            )),
            icon: forecast.current.icon.clone(),
            icon_url: format::icon_url(icon_base, &forecast.current.icon, IconSize::Large),
            sunrise: format::clock_time(&forecast.current.sunrise, tz),
            sunset: format::clock_time(&forecast.current.sunset, tz),
        };

        let hourly = forecast
            .hourly
            .iter()
            .map(|hour| ForecastTile {
                label: format::clock_time(&hour.time, tz),
                icon_url: format::icon_url(icon_base, &hour.icon, IconSize::ExtraLarge),
                temperature: format::degrees(format::round_temperature(hour.temperature)),
            })
            .collect();

        let daily = forecast
            .daily
            .iter()
            .map(|day| ForecastTile {
                label: format::weekday_label(&day.time, tz),
                icon_url: format::icon_url(icon_base, &day.icon, IconSize::ExtraLarge),
                temperature: format::degrees(format::round_temperature(day.temperature)),
            })
            .collect();

        Self {
            location,
            current,
            hourly,
            daily,
        }
    }
}
