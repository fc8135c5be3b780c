use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ForecastConfig;
use crate::error::ErrorBody;
use crate::forecast::{aggregate_daily, DailyForecast, DayBoundary, ForecastFeed};
use crate::location::{ActiveLocation, Coordinates, LocationTicket};
use crate::refresh::{RefreshHandler, RefreshTrigger};
use crate::units::Units;
use crate::weather::{CurrentConditions, ReadMode, WeatherService};

/// Display state of one data-bearing section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// No location selected
    Empty,
    Loading,
    /// Last fetch failed; the client may retry
    Error,
    Populated,
}

impl SectionStatus {
    pub fn select(has_coordinates: bool, has_data: bool, has_error: bool) -> Self {
        match (has_coordinates, has_data, has_error) {
            (false, _, _) => Self::Empty,
            (true, _, true) => Self::Error,
            (true, true, false) => Self::Populated,
            (true, false, false) => Self::Loading,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView<T> {
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// A failed section answers with the status of its error kind
impl<T: Serialize> IntoResponse for SectionView<T> {
    fn into_response(self) -> Response {
        let status = match &self.error {
            Some(error) if self.status == SectionStatus::Error => error.kind.status_code(),
            _ => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}

/// Fetched data tagged with the location generation it belongs to
struct Section<T> {
    generation: u64,
    data: Option<T>,
    error: Option<ErrorBody>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            data: None,
            error: None,
        }
    }
}

/// View state behind the dashboard: the active location, the session's unit
/// system and the current-conditions and forecast sections.
///
/// Sections written under an older location generation read back as empty,
/// so results for a previous location never leak into the view.
pub struct Dashboard {
    weather: WeatherService,
    location: ActiveLocation,
    units: RwLock<Units>,
    forecast_days: usize,
    day_boundary: DayBoundary,
    current: RwLock<Section<Arc<CurrentConditions>>>,
    forecast: RwLock<Section<Arc<ForecastFeed>>>,
}

impl Dashboard {
    pub fn new(weather: WeatherService, units: Units, forecast: &ForecastConfig) -> Self {
        Self {
            weather,
            location: ActiveLocation::new(),
            units: RwLock::new(units),
            forecast_days: forecast.days,
            day_boundary: forecast.day_boundary,
            current: RwLock::new(Section::default()),
            forecast: RwLock::new(Section::default()),
        }
    }

    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location.get()
    }

    pub fn select_location(&self, coordinates: Coordinates) -> u64 {
        let generation = self.location.set(Some(coordinates));
        tracing::info!(lat = coordinates.lat, lon = coordinates.lon, generation, "Location selected");
        generation
    }

    pub fn clear_location(&self) {
        let generation = self.location.set(None);
        tracing::info!(generation, "Location cleared");
    }

    pub fn units(&self) -> Units {
        *self.units.read()
    }

    /// Switch the session's unit system; data fetched in the old one is dropped
    pub fn set_units(&self, units: Units) {
        let previous = std::mem::replace(&mut *self.units.write(), units);
        if previous != units {
            let generation = self.location.supersede();
            tracing::info!(from = %previous, to = %units, generation, "Unit system changed");
        }
    }

    pub async fn load_current(&self, mode: ReadMode) -> SectionView<CurrentConditions> {
        if let Some(ticket) = self.location.ticket() {
            begin_load(&self.current, &ticket);
            let result = self
                .weather
                .current(ticket.coordinates, self.units(), mode)
                .await;
            self.apply(&self.current, &ticket, result.map_err(|e| ErrorBody::from(&e)));
        }
        self.current_view()
    }

    pub async fn load_forecast(&self, mode: ReadMode, days: Option<usize>) -> SectionView<DailyForecast> {
        if let Some(ticket) = self.location.ticket() {
            begin_load(&self.forecast, &ticket);
            let result = self
                .weather
                .forecast(ticket.coordinates, self.units(), mode)
                .await;
            self.apply(&self.forecast, &ticket, result.map_err(|e| ErrorBody::from(&e)));
        }
        self.forecast_view(days)
    }

    /// Refetch both sections for the active location
    pub async fn reload(&self, mode: ReadMode) {
        tokio::join!(self.load_current(mode), self.load_forecast(mode, None));
    }

    pub fn current_view(&self) -> SectionView<CurrentConditions> {
        self.view(&self.current, |conditions| CurrentConditions::clone(conditions))
    }

    pub fn forecast_view(&self, days: Option<usize>) -> SectionView<DailyForecast> {
        let days = days.unwrap_or(self.forecast_days);
        self.view(&self.forecast, |feed| self.summarize(feed, days))
    }

    fn summarize(&self, feed: &ForecastFeed, days: usize) -> DailyForecast {
        let days = match self.day_boundary {
            DayBoundary::Location => aggregate_daily(&feed.samples, &feed.utc_offset(), days),
            DayBoundary::Host => aggregate_daily(&feed.samples, &Local, days),
        };
        DailyForecast {
            city: feed.city.clone(),
            days,
        }
    }

    fn apply<T>(
        &self,
        section: &RwLock<Section<T>>,
        ticket: &LocationTicket,
        result: Result<T, ErrorBody>,
    ) {
        if !self.location.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "Discarding result for superseded location");
            return;
        }

        let mut section = section.write();
        if section.generation != ticket.generation {
            *section = Section {
                generation: ticket.generation,
                ..Section::default()
            };
        }
        match result {
            Ok(data) => {
                section.data = Some(data);
                section.error = None;
            }
            Err(error) => section.error = Some(error),
        }
    }

    fn view<T, U>(&self, section: &RwLock<Section<T>>, project: impl FnOnce(&T) -> U) -> SectionView<U> {
        let Some(ticket) = self.location.ticket() else {
            return SectionView {
                status: SectionStatus::Empty,
                data: None,
                error: None,
            };
        };

        let section = section.read();
        let (data, error) = if section.generation == ticket.generation {
            (section.data.as_ref().map(project), section.error.clone())
        } else {
            (None, None)
        };

        SectionView {
            status: SectionStatus::select(true, data.is_some(), error.is_some()),
            data,
            error,
        }
    }
}

/// A retry clears the previous error so the section reads as loading
fn begin_load<T>(section: &RwLock<Section<T>>, ticket: &LocationTicket) {
    let mut section = section.write();
    if section.generation == ticket.generation {
        section.error = None;
    }
}

#[async_trait]
impl RefreshHandler for Dashboard {
    async fn on_refresh(&self, trigger: RefreshTrigger) {
        if trigger == RefreshTrigger::Manual {
            self.weather.invalidate_all();
        }
        self.reload(ReadMode::Force).await;
    }
}
