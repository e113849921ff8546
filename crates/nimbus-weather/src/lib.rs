//! Weather data for Nimbus
//!
//! Location, reverse geocoding and OpenWeatherMap One Call providers, plus
//! the windowing and formatting rules that turn a provider response into
//! what the screen shows.

pub mod types;
pub mod format;
pub mod forecast;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod retry;

pub use types::*;
pub use forecast::{CurrentConditions, ForecastTile, WeatherView};
pub use geocode::{NominatimGeocoder, ReverseGeocoder};
pub use location::{DisabledLocation, IpLocator, LocationProvider, StaticLocation};
pub use provider::{OpenWeatherClient, WeatherSource};
pub use retry::RetryConfig;
