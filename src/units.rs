use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit system threaded through every API request of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }

    pub fn temperature_symbol(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
            Self::Standard => "K",
        }
    }

    pub fn speed_unit(self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric | Self::Standard => "m/s",
        }
    }

    pub fn format_temperature(self, temp: f64) -> String {
        format!("{}{}", temp.round(), self.temperature_symbol())
    }

    pub fn format_wind_speed(self, speed: f64) -> String {
        format!("{:.1} {}", speed, self.speed_unit())
    }

    /// Visibility arrives in meters regardless of the unit system
    pub fn format_visibility(self, meters: u32) -> String {
        match self {
            Self::Imperial => format!("{:.1} mi", meters as f64 / 1609.344),
            Self::Metric | Self::Standard => format!("{:.1} km", meters as f64 / 1000.0),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            "standard" => Ok(Self::Standard),
            other => Err(format!("Unknown unit system: {}", other)),
        }
    }
}

/// Cardinal direction for a wind bearing in degrees
pub fn wind_direction(degrees: u32) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((degrees as f64 / 45.0).round() as usize) % DIRECTIONS.len();
    DIRECTIONS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("metric".parse::<Units>(), Ok(Units::Metric));
        assert_eq!(" Imperial ".parse::<Units>(), Ok(Units::Imperial));
        assert_eq!("standard".parse::<Units>(), Ok(Units::Standard));
        assert!("kelvin".parse::<Units>().is_err());
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(Units::Metric.format_temperature(21.6), "22°C");
        assert_eq!(Units::Imperial.format_temperature(70.2), "70°F");
        assert_eq!(Units::Standard.format_temperature(293.15), "293K");
    }

    #[test]
    fn test_format_wind_and_visibility() {
        assert_eq!(Units::Metric.format_wind_speed(3.456), "3.5 m/s");
        assert_eq!(Units::Imperial.format_wind_speed(10.0), "10.0 mph");
        assert_eq!(Units::Metric.format_visibility(10000), "10.0 km");
        assert_eq!(Units::Imperial.format_visibility(16093), "10.0 mi");
    }

    #[test]
    fn test_wind_direction() {
        assert_eq!(wind_direction(0), "N");
        assert_eq!(wind_direction(44), "NE");
        assert_eq!(wind_direction(180), "S");
        assert_eq!(wind_direction(350), "N");
    }
}
