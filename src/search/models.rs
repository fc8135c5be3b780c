use serde::Serialize;
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::location::Coordinates;
use crate::openweather::models::GeoLocation;

/// A city candidate offered while the user types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    /// Generated locally; the geocoding API has no stable id
    pub id: Uuid,
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub coordinates: Coordinates,
    pub display_name: String,
}

impl From<GeoLocation> for SearchSuggestion {
    fn from(location: GeoLocation) -> Self {
        let display_name = match &location.state {
            Some(state) => format!("{}, {}, {}", location.name, state, location.country),
            None => format!("{}, {}", location.name, location.country),
        };

        Self {
            id: Uuid::new_v4(),
            name: location.name,
            country: location.country,
            state: location.state,
            coordinates: Coordinates {
                lat: location.lat,
                lon: location.lon,
            },
            display_name,
        }
    }
}

/// Observable state of the search box.
/// `Ready` with no suggestions and `Failed` are deliberately distinct.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchState {
    #[default]
    Idle,
    Searching {
        query: String,
    },
    Ready {
        query: String,
        suggestions: Vec<SearchSuggestion>,
    },
    Failed {
        query: String,
        error: ErrorBody,
    },
}

impl SearchState {
    pub fn suggestions(&self) -> &[SearchSuggestion] {
        match self {
            Self::Ready { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// A search completed successfully but matched nothing
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Ready { suggestions, .. } if suggestions.is_empty())
    }
}

/// What became of one `submit` call
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Below the minimum length; nothing was sent and suggestions were cleared
    TooShort,
    /// A newer query or a clear arrived first; nothing from this call was applied
    Superseded,
    /// The call ran to completion and its state was applied
    Completed(SearchState),
}
