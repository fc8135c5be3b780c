use serde::{Deserialize, Serialize};

use crate::location::Coordinates;

// ============================================================================
// Geocoding API Response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    pub state: Option<String>,
}

// ============================================================================
// Shared pieces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Error body returned by the API alongside non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

// ============================================================================
// Current weather (/weather)
// These structs deserialize the raw API response; not all fields are used
// ============================================================================

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub coord: Coordinates,
    pub weather: Vec<WeatherCondition>,
    pub main: MainInfo,
    #[serde(default)]
    pub visibility: Option<u32>,
    pub wind: WindInfo,
    #[serde(default)]
    pub clouds: CloudInfo,
    pub dt: i64,
    pub sys: SysInfo,
    /// Shift in seconds from UTC
    #[serde(default)]
    pub timezone: i32,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct MainInfo {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: u32,
    pub humidity: u32,
}

#[derive(Debug, Deserialize)]
pub struct WindInfo {
    pub speed: f64,
    #[serde(default)]
    pub deg: u32,
    pub gust: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloudInfo {
    #[serde(default)]
    pub all: u32,
}

#[derive(Debug, Deserialize)]
pub struct SysInfo {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

// ============================================================================
// 5 day / 3 hour forecast (/forecast)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ForecastApiResponse {
    pub list: Vec<ForecastItem>,
    pub city: ForecastCity,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: MainInfo,
    pub weather: Vec<WeatherCondition>,
    pub wind: WindInfo,
    /// Probability of precipitation, 0-1
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    pub coord: Coordinates,
    #[serde(default)]
    pub country: String,
    /// Shift in seconds from UTC
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}
