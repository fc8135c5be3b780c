use axum::{extract::State, Json};

use super::{PreferenceError, Preferences, PreferencesUpdate};
use crate::AppState;

/// GET /preferences - theme, units and recent searches
pub async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.preferences.get().await)
}

/// PUT /preferences - update theme and/or units
///
/// A unit change also switches the dashboard session.
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>, PreferenceError> {
    let prefs = state.preferences.update(update).await?;
    state.dashboard.set_units(prefs.units);
    Ok(Json(prefs))
}

/// DELETE /preferences/recent - forget recent searches
pub async fn clear_recent_searches(
    State(state): State<AppState>,
) -> Result<Json<Preferences>, PreferenceError> {
    state.preferences.clear_recent_searches().await?;
    Ok(Json(state.preferences.get().await))
}
