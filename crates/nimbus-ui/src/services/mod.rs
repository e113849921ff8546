//! Backend services the models talk to. Network work runs on the bridge
//! runtime and results come back over channels.

pub mod weather_service;

pub use weather_service::{request_fetch, WeatherServiceMessage};
