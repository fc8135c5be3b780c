pub mod handlers;
mod storage;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::HttpError;
use crate::impl_into_response;
use crate::units::Units;

pub use storage::PreferenceStore;

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Preference storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

impl HttpError for PreferenceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_code(&self) -> Option<&'static str> {
        Some("PREFERENCE_STORAGE")
    }
}

impl_into_response!(PreferenceError);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Terminal color-scheme hint (`COLORFGBG`), light when absent
    pub fn system_default() -> Self {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| Self::from_colorfgbg(&value))
            .unwrap_or(Self::Light)
    }

    /// `COLORFGBG` is "fg;bg" (sometimes "fg;default;bg"); the last field is
    /// the background's ANSI color index
    fn from_colorfgbg(value: &str) -> Option<Self> {
        let background: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
        Some(if background < 7 || background == 8 {
            Self::Dark
        } else {
            Self::Light
        })
    }
}

/// On-disk shape; absent keys fall back to defaults when read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    units: Option<Units>,
    #[serde(default)]
    recent_searches: Vec<String>,
}

/// Effective preferences with defaults applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub units: Units,
    pub recent_searches: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub units: Option<Units>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_colorfgbg() {
        assert_eq!(Theme::from_colorfgbg("15;0"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("0;15"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("12;default;8"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("0;7"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("garbage"), None);
    }

    #[test]
    fn test_stored_preferences_tolerate_missing_keys() {
        let stored: StoredPreferences = serde_json::from_str(r#"{"units": "imperial"}"#).unwrap();
        assert_eq!(stored.units, Some(Units::Imperial));
        assert!(stored.theme.is_none());
        assert!(stored.recent_searches.is_empty());
    }
}
