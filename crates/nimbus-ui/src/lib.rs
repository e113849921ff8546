//! View controller for the Nimbus weather screen.
//!
//! `services` runs the startup fetch sequence off the caller's thread,
//! `models` holds the render state and view mode the screen draws from.

pub mod bridge;
pub mod error_mapping;
pub mod models;
pub mod services;

pub use models::weather_model::{RenderState, ViewMode, WeatherModel};
pub use services::weather_service::{PipelineError, Stage, WeatherService, WeatherServiceMessage};
