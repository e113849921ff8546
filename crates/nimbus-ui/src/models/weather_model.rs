use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use nimbus_weather::{CurrentConditions, ForecastTile, WeatherView};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::services::weather_service::{
    self, PipelineError, WeatherService, WeatherServiceMessage, PERMISSION_ALERT,
};

/// Which forecast strip is shown. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Hourly forecast
    #[default]
    Today,
    /// Daily forecast
    Week,
}

/// `Loading` → `Error` | `Ready`. `Error` goes back to `Loading` only
/// through [`WeatherModel::retry`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Loading,
    Error {
        message: &'static str,
        retryable: bool,
    },
    Ready(Box<WeatherView>),
}

pub struct WeatherModel {
    state: RenderState,
    view_mode: ViewMode,
    /// Pending one-shot alert text
    alert: Option<&'static str>,
    started: bool,
    service: Arc<WeatherService>,
    runtime: Handle,
    cancel: CancellationToken,
    tx: Sender<WeatherServiceMessage>,
    rx: Receiver<WeatherServiceMessage>,
}

impl WeatherModel {
    pub fn new(service: Arc<WeatherService>, runtime: Handle) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self {
            state: RenderState::Loading,
            view_mode: ViewMode::default(),
            alert: None,
            started: false,
            service,
            runtime,
            cancel: CancellationToken::new(),
            tx,
            rx,
        }
    }

    /// Kick off the startup sequence. Only the first call does anything.
    pub fn start(&mut self) {
        if self.started {
            tracing::debug!("WeatherModel already started");
            return;
        }
        self.started = true;
        self.spawn_fetch();
    }

    fn spawn_fetch(&self) {
        weather_service::request_fetch(
            &self.tx,
            self.service.clone(),
            &self.runtime,
            self.cancel.child_token(),
        );
    }

    /// Drain finished fetches. Returns true if the render state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                WeatherServiceMessage::FetchDone(result) => changed |= self.apply(result),
            }
        }
        changed
    }

    fn apply(&mut self, result: Result<WeatherView, PipelineError>) -> bool {
        if self.state != RenderState::Loading {
            tracing::debug!("Ignoring fetch result outside of loading state");
            return false;
        }

        match result {
            Ok(view) => {
                tracing::info!("Weather ready for {}", view.location.city);
                self.state = RenderState::Ready(Box::new(view));
            }
            Err(PipelineError::Cancelled) => return false,
            Err(PipelineError::PermissionDenied) => {
                self.alert = Some(PERMISSION_ALERT);
                self.state = RenderState::Error {
                    message: PipelineError::PermissionDenied.user_message(),
                    retryable: false,
                };
            }
            Err(e) => {
                tracing::warn!("Showing error screen: {}", e);
                self.state = RenderState::Error {
                    message: e.user_message(),
                    retryable: e.is_retryable(),
                };
            }
        }
        true
    }

    /// Re-run the startup sequence from a retryable error.
    /// Returns false (and does nothing) in any other state.
    pub fn retry(&mut self) -> bool {
        if !self.can_retry() || self.cancel.is_cancelled() {
            return false;
        }
        tracing::info!("Retrying weather fetch");
        self.state = RenderState::Loading;
        self.spawn_fetch();
        true
    }

    /// Switch the visible forecast. Selecting the active mode is a no-op.
    /// Returns true if the mode changed.
    pub fn select(&mut self, mode: ViewMode) -> bool {
        if self.view_mode == mode {
            return false;
        }
        self.view_mode = mode;
        true
    }

    pub fn toggle_today(&mut self) -> bool {
        self.select(ViewMode::Today)
    }

    pub fn toggle_week(&mut self) -> bool {
        self.select(ViewMode::Week)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn is_today_selected(&self) -> bool {
        self.view_mode == ViewMode::Today
    }

    pub fn is_week_selected(&self) -> bool {
        self.view_mode == ViewMode::Week
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == RenderState::Loading
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RenderState::Ready(_))
    }

    pub fn can_retry(&self) -> bool {
        matches!(self.state, RenderState::Error { retryable: true, .. })
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self.state {
            RenderState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Heading text: the error message, or the city once ready
    pub fn title(&self) -> Option<&str> {
        match &self.state {
            RenderState::Loading => None,
            RenderState::Error { message, .. } => Some(*message),
            RenderState::Ready(view) => Some(view.location.city.as_str()),
        }
    }

    pub fn current(&self) -> Option<&CurrentConditions> {
        match &self.state {
            RenderState::Ready(view) => Some(&view.current),
            _ => None,
        }
    }

    /// Tiles for the active view mode; empty unless ready
    pub fn visible_forecast(&self) -> &[ForecastTile] {
        match (&self.state, self.view_mode) {
            (RenderState::Ready(view), ViewMode::Today) => view.hourly.as_slice(),
            (RenderState::Ready(view), ViewMode::Week) => view.daily.as_slice(),
            _ => &[],
        }
    }

    /// The pending alert, if any. Each alert is returned once.
    pub fn take_alert(&mut self) -> Option<&'static str> {
        self.alert.take()
    }

    /// Abort any in-flight fetch. Results that were already sent are
    /// still drained by `poll` but a cancelled sequence sends nothing.
    pub fn shutdown(&mut self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Cancelling weather fetch");
            self.cancel.cancel();
        }
    }
}

impl Drop for WeatherModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
