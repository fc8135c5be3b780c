use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{locate_within, Coordinates, GeolocationError, GeolocationReport, LocationError};
use crate::error::HttpError;
use crate::extractors::ParamRejection;
use crate::impl_into_response;
use crate::refresh::RefreshStatus;
use crate::AppState;

impl HttpError for LocationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_code(&self) -> Option<&'static str> {
        Some("INVALID_COORDINATES")
    }
}

impl_into_response!(LocationError);

impl HttpError for GeolocationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::PositionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PositionUnavailable => "POSITION_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
        })
    }
}

impl_into_response!(GeolocationError);

#[derive(Debug, Deserialize)]
pub struct SelectLocationRequest {
    pub lat: f64,
    pub lon: f64,
    /// Display name of the chosen suggestion, remembered as a recent search
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub refresh: RefreshStatus,
}

fn location_response(state: &AppState) -> Json<LocationResponse> {
    Json(LocationResponse {
        coordinates: state.dashboard.location(),
        refresh: state.scheduler.status(),
    })
}

/// Make `coordinates` the active location and restart the refresh countdown
fn activate(state: &AppState, coordinates: Coordinates) {
    state.dashboard.select_location(coordinates);
    state.scheduler.arm();
}

/// GET /location - the active location and refresh countdown
pub async fn get_location(State(state): State<AppState>) -> Json<LocationResponse> {
    location_response(&state)
}

/// PUT /location - select a location (typically a search suggestion)
pub async fn select_location(
    State(state): State<AppState>,
    Json(request): Json<SelectLocationRequest>,
) -> Result<Json<LocationResponse>, LocationError> {
    let coordinates = Coordinates::new(request.lat, request.lon)?;
    activate(&state, coordinates);

    if let Some(label) = request.label.as_deref() {
        if let Err(e) = state.preferences.add_recent_search(label).await {
            tracing::warn!(error = %e, "Failed to remember recent search");
        }
    }

    Ok(location_response(&state))
}

/// DELETE /location - back to idle; the countdown stops
pub async fn clear_location(State(state): State<AppState>) -> StatusCode {
    state.dashboard.clear_location();
    state.scheduler.disarm();
    StatusCode::NO_CONTENT
}

/// POST /location/current - use the device position
///
/// The body carries the browser's geolocation outcome. With an empty body
/// the configured geolocation provider is asked instead.
pub async fn use_current_location(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LocationResponse>, Response> {
    let result = if body.is_empty() {
        locate_within(state.geolocator.as_ref(), state.config.geolocation_timeout()).await
    } else {
        let report: GeolocationReport = serde_json::from_slice(&body).map_err(|e| {
            ParamRejection(format!("Invalid geolocation report: {}", e)).into_response()
        })?;
        report.into_result()
    };

    match result {
        Ok(coordinates) => {
            activate(&state, coordinates);
            Ok(location_response(&state))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Geolocation failed");
            Err(e.into_response())
        }
    }
}
