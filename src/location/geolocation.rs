use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::Coordinates;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Location permission denied. Please enable location access.")]
    PermissionDenied,

    #[error("Location information unavailable.")]
    PositionUnavailable,

    #[error("Location request timed out.")]
    Timeout,
}

/// One-shot position provider
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, GeolocationError>;
}

/// Position taken from configuration (`home`), for hosts without a browser
pub struct HomeLocation {
    position: Option<Coordinates>,
}

impl HomeLocation {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for HomeLocation {
    async fn locate(&self) -> Result<Coordinates, GeolocationError> {
        self.position.ok_or(GeolocationError::PositionUnavailable)
    }
}

/// Run a geolocation request with a ceiling
pub async fn locate_within(
    geolocator: &dyn Geolocator,
    timeout: Duration,
) -> Result<Coordinates, GeolocationError> {
    match tokio::time::timeout(timeout, geolocator.locate()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Geolocation timed out");
            Err(GeolocationError::Timeout)
        }
    }
}

/// Outcome of a browser geolocation call relayed by the front end.
/// Error codes follow the W3C `GeolocationPositionError` numbering.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GeolocationReport {
    Position { lat: f64, lon: f64 },
    Failure { code: u8 },
}

impl GeolocationReport {
    pub fn into_result(self) -> Result<Coordinates, GeolocationError> {
        match self {
            Self::Position { lat, lon } => {
                Coordinates::new(lat, lon).map_err(|_| GeolocationError::PositionUnavailable)
            }
            Self::Failure { code: 1 } => Err(GeolocationError::PermissionDenied),
            Self::Failure { code: 3 } => Err(GeolocationError::Timeout),
            Self::Failure { .. } => Err(GeolocationError::PositionUnavailable),
        }
    }
}
