use axum::{extract::State, Json};

use super::RefreshStatus;
use crate::AppState;

/// Countdown to the next automatic refresh
///
/// GET /refresh
pub async fn refresh_status(State(state): State<AppState>) -> Json<RefreshStatus> {
    Json(state.scheduler.status())
}

/// Refresh now: invalidate cached responses, refetch, restart the countdown
///
/// POST /refresh
pub async fn refresh_now(State(state): State<AppState>) -> Json<RefreshStatus> {
    if !state.scheduler.refresh_now().await {
        // Idle: nothing to refetch, but the next read must still miss the cache
        state.dashboard.weather().invalidate_all();
    }
    Json(state.scheduler.status())
}
