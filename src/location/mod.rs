pub mod geolocation;
pub mod handlers;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geolocation::{locate_within, GeolocationError, GeolocationReport, Geolocator, HomeLocation};

#[derive(Error, Debug, PartialEq)]
pub enum LocationError {
    #[error("Latitude out of range: {0}")]
    InvalidLatitude(f64),

    #[error("Longitude out of range: {0}")]
    InvalidLongitude(f64),
}

/// Latitude/longitude pair tying search, weather and forecast together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        let coords = Self { lat, lon };
        coords.validate()?;
        Ok(coords)
    }

    pub fn validate(&self) -> Result<(), LocationError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(LocationError::InvalidLatitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(LocationError::InvalidLongitude(self.lon));
        }
        Ok(())
    }

    /// Stable string form used in cache keys (~11 m resolution)
    pub fn cache_subject(&self) -> String {
        format!("{:.4},{:.4}", self.lat, self.lon)
    }
}

/// Identifies the location a fetch was issued for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationTicket {
    pub generation: u64,
    pub coordinates: Coordinates,
}

#[derive(Debug, Default)]
struct LocationState {
    generation: u64,
    coordinates: Option<Coordinates>,
}

/// The single active coordinate pair driving weather/forecast fetches.
///
/// Every change bumps the generation; results fetched under an older
/// ticket are discarded by the caller.
#[derive(Debug, Default)]
pub struct ActiveLocation {
    state: RwLock<LocationState>,
}

impl ActiveLocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or clear) the active coordinates; returns the new generation
    pub fn set(&self, coordinates: Option<Coordinates>) -> u64 {
        let mut state = self.state.write();
        state.generation += 1;
        state.coordinates = coordinates;
        state.generation
    }

    /// Bump the generation without moving, e.g. after a unit change
    pub fn supersede(&self) -> u64 {
        let mut state = self.state.write();
        state.generation += 1;
        state.generation
    }

    pub fn get(&self) -> Option<Coordinates> {
        self.state.read().coordinates
    }

    pub fn ticket(&self) -> Option<LocationTicket> {
        let state = self.state.read();
        state.coordinates.map(|coordinates| LocationTicket {
            generation: state.generation,
            coordinates,
        })
    }

    pub fn is_current(&self, ticket: &LocationTicket) -> bool {
        self.state.read().generation == ticket.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(51.5, -0.12).is_ok());
        assert_eq!(
            Coordinates::new(91.0, 0.0),
            Err(LocationError::InvalidLatitude(91.0))
        );
        assert_eq!(
            Coordinates::new(0.0, -181.0),
            Err(LocationError::InvalidLongitude(-181.0))
        );
    }

    #[test]
    fn test_cache_subject_rounds() {
        let coords = Coordinates { lat: 51.507351, lon: -0.127758 };
        assert_eq!(coords.cache_subject(), "51.5074,-0.1278");
    }

    #[test]
    fn test_ticket_invalidated_by_new_location() {
        let active = ActiveLocation::new();
        assert!(active.ticket().is_none());

        active.set(Some(Coordinates { lat: 1.0, lon: 2.0 }));
        let ticket = active.ticket().unwrap();
        assert!(active.is_current(&ticket));

        active.set(Some(Coordinates { lat: 3.0, lon: 4.0 }));
        assert!(!active.is_current(&ticket));
        assert_eq!(active.get(), Some(Coordinates { lat: 3.0, lon: 4.0 }));
    }

    #[test]
    fn test_clear_and_supersede() {
        let active = ActiveLocation::new();
        active.set(Some(Coordinates { lat: 1.0, lon: 2.0 }));
        let ticket = active.ticket().unwrap();

        active.supersede();
        assert!(!active.is_current(&ticket));
        assert!(active.get().is_some());

        active.set(None);
        assert!(active.ticket().is_none());
    }
}
