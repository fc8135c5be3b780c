use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::forecast::DayBoundary;
use crate::location::Coordinates;
use crate::units::Units;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenWeatherMap API key
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the weather endpoints (/weather, /forecast)
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// Base URL of the geocoding endpoints (/direct)
    #[serde(default = "default_geo_base_url")]
    pub geo_base_url: String,

    /// Ceiling for every upstream call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Unit system used when no preference is stored
    #[serde(default)]
    pub default_units: Units,

    /// Language for condition descriptions
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Nominal upstream request budget; exceeding it only logs
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Auto-refresh interval while a location is selected
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Key-value file holding theme/unit preferences
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,

    /// Position reported by the geolocation provider, if any
    #[serde(default)]
    pub home: Option<Coordinates>,

    #[serde(default = "default_geolocation_timeout_ms")]
    pub geolocation_timeout_ms: u64,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entries younger than this are served without refetching
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,

    /// Entries older than this are discarded
    #[serde(default = "default_cache_expiry_ms")]
    pub expiry_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: default_stale_time_ms(),
            expiry_ms: default_cache_expiry_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_min_search_length")]
    pub min_length: usize,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_search_length(),
            debounce_ms: default_debounce_ms(),
            limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    /// Number of daily summaries returned
    #[serde(default = "default_forecast_days")]
    pub days: usize,

    /// Which clock decides where a forecast day starts
    #[serde(default)]
    pub day_boundary: DayBoundary,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            days: default_forecast_days(),
            day_boundary: DayBoundary::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Extra attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geo_base_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_rate_limit() -> u32 {
    60
}

fn default_refresh_interval_ms() -> u64 {
    10 * 60 * 1000
}

fn default_preferences_path() -> String {
    "data/preferences.json".to_string()
}

fn default_geolocation_timeout_ms() -> u64 {
    10_000
}

fn default_stale_time_ms() -> u64 {
    5 * 60 * 1000
}

fn default_cache_expiry_ms() -> u64 {
    10 * 60 * 1000
}

fn default_min_search_length() -> usize {
    2
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_search_limit() -> usize {
    5
}

fn default_forecast_days() -> usize {
    7
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Start with default values
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("default_units", Units::default().as_str())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with WEATHERDASH_)
            // Convert SCREAMING_SNAKE_CASE env vars to snake_case config keys
            .add_source(
                Environment::with_prefix("WEATHERDASH")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate(cfg!(debug_assertions))?;
        Ok(config)
    }

    /// A missing API key is fatal in development builds; release builds keep
    /// running and every upstream call comes back unauthorized.
    pub fn validate(&self, strict: bool) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            if strict {
                return Err(ConfigError::Message(
                    "api_key is required (set WEATHERDASH_API_KEY)".to_string(),
                ));
            }
            tracing::warn!("No API key configured; weather requests will be rejected upstream");
        }

        if self.cache.stale_time_ms > self.cache.expiry_ms {
            tracing::warn!(
                stale_time_ms = self.cache.stale_time_ms,
                expiry_ms = self.cache.expiry_ms,
                "Cache stale time exceeds expiry; stale reads will never be served"
            );
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(r#"{"api_key": "abc"}"#);
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.default_units, Units::Metric);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.cache.stale_time_ms, 300_000);
        assert_eq!(config.cache.expiry_ms, 600_000);
        assert_eq!(config.search.min_length, 2);
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.forecast.days, 7);
        assert_eq!(config.forecast.day_boundary, DayBoundary::Location);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.refresh_interval(), Duration::from_secs(600));
        assert!(config.home.is_none());
    }

    #[test]
    fn test_nested_overrides() {
        let config = parse(
            r#"{"api_key": "abc", "default_units": "imperial",
                "cache": {"stale_time_ms": 1000},
                "home": {"lat": 51.5, "lon": -0.12}}"#,
        );
        assert_eq!(config.default_units, Units::Imperial);
        assert_eq!(config.cache.stale_time_ms, 1000);
        assert_eq!(config.cache.expiry_ms, 600_000);
        assert_eq!(config.home, Some(Coordinates { lat: 51.5, lon: -0.12 }));
    }

    #[test]
    fn test_missing_api_key_strict_fails() {
        let config = parse("{}");
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_missing_api_key_lenient_continues() {
        let config = parse("{}");
        assert!(config.validate(false).is_ok());
    }
}
