use serde::Serialize;

use crate::error::ApiError;
use crate::location::Coordinates;
use crate::openweather::models::CurrentWeatherResponse;
use crate::openweather::WeatherCondition;
use crate::units::{wind_direction, Units};

/// Current conditions at the active location
#[derive(Debug, Clone, Serialize)]
pub struct CurrentConditions {
    pub city: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u32,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub cloudiness: u32,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    pub condition: WeatherCondition,
    pub sunrise: i64,
    pub sunset: i64,
    /// Observation time, epoch seconds
    pub observed_at: i64,
    /// Shift in seconds from UTC
    pub timezone_offset: i32,
    pub is_day: bool,
    pub units: Units,
    pub display: DisplayValues,
}

/// Pre-formatted strings for the current-conditions card
#[derive(Debug, Clone, Serialize)]
pub struct DisplayValues {
    pub temperature: String,
    pub feels_like: String,
    pub high_low: String,
    pub wind: String,
    pub humidity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl CurrentConditions {
    pub fn from_response(raw: CurrentWeatherResponse, units: Units) -> Result<Self, ApiError> {
        let condition = raw
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Unknown("No weather information available".to_string()))?;

        let is_day = raw.sys.sunrise == 0
            || (raw.sys.sunrise..raw.sys.sunset).contains(&raw.dt);

        let display = DisplayValues {
            temperature: units.format_temperature(raw.main.temp),
            feels_like: units.format_temperature(raw.main.feels_like),
            high_low: format!(
                "H: {} L: {}",
                units.format_temperature(raw.main.temp_max),
                units.format_temperature(raw.main.temp_min)
            ),
            wind: format!(
                "{} {}",
                units.format_wind_speed(raw.wind.speed),
                wind_direction(raw.wind.deg)
            ),
            humidity: format!("{}%", raw.main.humidity),
            visibility: raw.visibility.map(|meters| units.format_visibility(meters)),
        };

        Ok(Self {
            city: raw.name,
            country: raw.sys.country,
            coordinates: raw.coord,
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            temp_min: raw.main.temp_min,
            temp_max: raw.main.temp_max,
            humidity: raw.main.humidity,
            pressure: raw.main.pressure,
            wind_speed: raw.wind.speed,
            wind_deg: raw.wind.deg,
            wind_gust: raw.wind.gust,
            cloudiness: raw.clouds.all,
            visibility: raw.visibility,
            condition,
            sunrise: raw.sys.sunrise,
            sunset: raw.sys.sunset,
            observed_at: raw.dt,
            timezone_offset: raw.timezone,
            is_day,
            units,
            display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(weather: serde_json::Value) -> CurrentWeatherResponse {
        serde_json::from_value(serde_json::json!({
            "coord": {"lat": 51.5074, "lon": -0.1278},
            "weather": weather,
            "main": {"temp": 15.4, "feels_like": 14.2, "temp_min": 13.0, "temp_max": 17.6,
                     "pressure": 1012, "humidity": 72},
            "visibility": 10000,
            "wind": {"speed": 4.1, "deg": 250},
            "clouds": {"all": 75},
            "dt": 1710072000,
            "sys": {"country": "GB", "sunrise": 1710051600, "sunset": 1710093600},
            "timezone": 0,
            "name": "London"
        }))
        .unwrap()
    }

    #[test]
    fn test_from_response() {
        let conditions = CurrentConditions::from_response(
            raw(serde_json::json!([{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}])),
            Units::Metric,
        )
        .unwrap();

        assert_eq!(conditions.city, "London");
        assert_eq!(conditions.condition.id, 803);
        assert_eq!(conditions.cloudiness, 75);
        assert!(conditions.is_day);
        assert_eq!(conditions.display.temperature, "15°C");
        assert_eq!(conditions.display.high_low, "H: 18°C L: 13°C");
        assert_eq!(conditions.display.wind, "4.1 m/s W");
        assert_eq!(conditions.display.visibility.as_deref(), Some("10.0 km"));
    }

    #[test]
    fn test_missing_condition_is_unknown_error() {
        let err = CurrentConditions::from_response(raw(serde_json::json!([])), Units::Metric)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unknown);
    }
}
