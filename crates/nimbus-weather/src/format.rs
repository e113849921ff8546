//! Display formatting for times, temperatures and icons.
//!
//! The current temperature is floored while forecast temperatures are
//! rounded. Both rules are kept as observed.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

/// Icon image resolution suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSize {
    /// `@2x`, used for the large current-conditions icon
    Large,
    /// `@4x`, used for forecast tiles
    ExtraLarge,
}

impl IconSize {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Large => "@2x",
            Self::ExtraLarge => "@4x",
        }
    }
}

/// `{base}/{icon}@2x.png`
pub fn icon_url(base: &str, icon: &str, size: IconSize) -> String {
    format!("{}/{}{}.png", base.trim_end_matches('/'), icon, size.suffix())
}

/// Zero-padded 24-hour `HH:MM` in `tz`
pub fn clock_time<Tz>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%H:%M").to_string()
}

/// Three-letter weekday name in `tz`, e.g. `Mon`
pub fn weekday_label<Tz>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%a").to_string()
}

/// Current temperature: largest integer not above `celsius`
pub fn floor_temperature(celsius: f64) -> i64 {
    celsius.floor() as i64
}

/// Forecast temperature: nearest integer, halves go up (-2.5 becomes -2)
pub fn round_temperature(celsius: f64) -> i64 {
    (celsius + 0.5).floor() as i64
}

pub fn degrees(value: i64) -> String {
    format!("{}°", value)
}
