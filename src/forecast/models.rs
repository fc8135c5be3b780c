use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::openweather::models::{ForecastApiResponse, ForecastCity, ForecastItem};
use crate::openweather::WeatherCondition;

/// One 3-hour observation from the forecast feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSample {
    /// Epoch seconds
    pub timestamp: i64,
    pub temperature: f64,
    pub humidity: u32,
    pub wind_speed: f64,
    /// 0-1
    pub precipitation_probability: f64,
    pub condition: WeatherCondition,
}

impl ForecastSample {
    /// Samples without a condition entry carry no representative weather and are skipped
    fn from_item(item: ForecastItem) -> Option<Self> {
        let condition = item.weather.into_iter().next()?;
        Some(Self {
            timestamp: item.dt,
            temperature: item.main.temp,
            humidity: item.main.humidity,
            wind_speed: item.wind.speed,
            precipitation_probability: item.pop,
            condition,
        })
    }
}

/// Forecast samples plus the city metadata they were issued for
#[derive(Debug, Clone, Serialize)]
pub struct ForecastFeed {
    pub city: ForecastCity,
    pub samples: Vec<ForecastSample>,
}

impl ForecastFeed {
    /// UTC offset of the forecast location; out-of-range values fall back to UTC
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.city.timezone).unwrap_or_else(|| Utc.fix())
    }
}

impl From<ForecastApiResponse> for ForecastFeed {
    fn from(response: ForecastApiResponse) -> Self {
        let total = response.list.len();
        let samples: Vec<ForecastSample> = response
            .list
            .into_iter()
            .filter_map(ForecastSample::from_item)
            .collect();

        if samples.len() != total {
            tracing::debug!(
                dropped = total - samples.len(),
                "Dropped forecast samples without a weather condition"
            );
        }

        Self {
            city: response.city,
            samples,
        }
    }
}

/// Temperature statistics for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// One row per calendar date, derived from that date's samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temp: TemperatureRange,
    /// Most frequent condition of the day (earliest wins a tie)
    pub condition: WeatherCondition,
    /// Mean humidity, rounded
    pub humidity: u32,
    pub wind_speed: f64,
    /// Highest precipitation probability of the day
    pub precipitation_probability: f64,
    pub sample_count: usize,
}

/// Which clock decides where a forecast day starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// The forecast location's own UTC offset
    #[default]
    Location,
    /// The host's local time zone
    Host,
}

/// Daily forecast returned to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    pub city: ForecastCity,
    pub days: Vec<DailySummary>,
}
