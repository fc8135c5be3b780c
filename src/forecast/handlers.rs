use axum::extract::{Query, State};
use serde::Deserialize;

use super::DailyForecast;
use crate::dashboard::SectionView;
use crate::extractors::UnitsParam;
use crate::weather::ReadMode;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    /// Number of days (defaults to the configured count)
    pub days: Option<usize>,
}

/// Daily summaries for the active location
///
/// GET /forecast/daily?days=5&units=metric
pub async fn get_daily_forecast(
    State(state): State<AppState>,
    units: UnitsParam,
    Query(query): Query<DailyQuery>,
) -> SectionView<DailyForecast> {
    if let Some(units) = units.0 {
        state.dashboard.set_units(units);
    }
    state
        .dashboard
        .load_forecast(ReadMode::Cached, query.days)
        .await
}
