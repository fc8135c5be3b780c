use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{SearchOutcome, SearchState};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    TooShort,
    Superseded,
    Completed,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub outcome: OutcomeKind,
    /// Search box state after this call
    pub state: SearchState,
}

/// Debounced city search; call on every keystroke
///
/// GET /search?q=Lon
///
/// A request overtaken by a newer one answers `superseded` together with the
/// state at that moment.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let (outcome, search_state) = match state.search.submit(&query.q).await {
        SearchOutcome::TooShort => (OutcomeKind::TooShort, state.search.state()),
        SearchOutcome::Superseded => (OutcomeKind::Superseded, state.search.state()),
        SearchOutcome::Completed(search_state) => (OutcomeKind::Completed, search_state),
    };

    Json(SearchResponse {
        outcome,
        state: search_state,
    })
}

/// Clear suggestions and cancel any outstanding search
///
/// DELETE /search
pub async fn clear_search(State(state): State<AppState>) -> StatusCode {
    state.search.clear();
    StatusCode::NO_CONTENT
}
