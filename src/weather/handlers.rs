use axum::{extract::State, Json};
use serde::Serialize;

use super::{CurrentConditions, ReadMode};
use crate::dashboard::SectionView;
use crate::extractors::UnitsParam;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current conditions at the active location
///
/// GET /weather?units=imperial
///
/// A `units` value different from the session's switches the session.
pub async fn get_weather(
    State(state): State<AppState>,
    units: UnitsParam,
) -> SectionView<CurrentConditions> {
    if let Some(units) = units.0 {
        state.dashboard.set_units(units);
    }
    state.dashboard.load_current(ReadMode::Cached).await
}
