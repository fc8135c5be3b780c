use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::models::{ApiErrorBody, CurrentWeatherResponse, ForecastApiResponse, GeoLocation};
use super::retry::RetryPolicy;
use crate::api_budget::RequestBudget;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::location::Coordinates;
use crate::units::Units;

const GEO_DIRECT_PATH: &str = "/direct";
const CURRENT_WEATHER_PATH: &str = "/weather";
const FORECAST_PATH: &str = "/forecast";

/// Connection settings shared by every request
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub weather_base_url: String,
    pub geo_base_url: String,
    pub timeout: Duration,
    pub language: String,
}

impl From<&AppConfig> for ApiSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            weather_base_url: config.weather_base_url.clone(),
            geo_base_url: config.geo_base_url.clone(),
            timeout: config.request_timeout(),
            language: config.default_language.clone(),
        }
    }
}

/// Thin client over the three read-only endpoints of the weather API
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    settings: Arc<ApiSettings>,
    budget: Arc<RequestBudget>,
    retry: RetryPolicy,
}

impl OpenWeatherClient {
    pub fn new(
        client: Client,
        settings: ApiSettings,
        budget: Arc<RequestBudget>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            budget,
            retry,
        }
    }

    /// Search cities by name via the direct geocoding endpoint
    pub async fn search_cities(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeoLocation>, ApiError> {
        tracing::debug!(query = %query, limit = limit, "Searching cities");

        let url = join_url(&self.settings.geo_base_url, GEO_DIRECT_PATH);
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("appid", self.settings.api_key.clone()),
        ];

        let mut locations: Vec<GeoLocation> =
            self.retry.run("search", || self.get_json(&url, &params)).await?;
        locations.truncate(limit);
        Ok(locations)
    }

    /// Current conditions at a coordinate pair
    pub async fn current_weather(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<CurrentWeatherResponse, ApiError> {
        tracing::debug!(lat = %coords.lat, lon = %coords.lon, units = %units, "Fetching current weather");

        let url = join_url(&self.settings.weather_base_url, CURRENT_WEATHER_PATH);
        let params = self.coordinate_params(coords, units);

        self.retry
            .run("current_weather", || self.get_json(&url, &params))
            .await
    }

    /// 5 day / 3 hour forecast at a coordinate pair
    pub async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastApiResponse, ApiError> {
        tracing::debug!(lat = %coords.lat, lon = %coords.lon, units = %units, "Fetching forecast");

        let url = join_url(&self.settings.weather_base_url, FORECAST_PATH);
        let params = self.coordinate_params(coords, units);

        self.retry
            .run("forecast", || self.get_json(&url, &params))
            .await
    }

    fn coordinate_params(&self, coords: Coordinates, units: Units) -> [(&'static str, String); 5] {
        [
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("units", units.as_str().to_string()),
            ("lang", self.settings.language.clone()),
            ("appid", self.settings.api_key.clone()),
        ]
    }

    /// One GET attempt: send, classify the status, decode the body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let usage = self.budget.record_call();
        if usage.is_over() {
            tracing::warn!(
                url = %url,
                calls_last_minute = usage.in_window,
                per_minute = usage.per_minute,
                frees_in_ms = usage.frees_in.as_millis() as u64,
                "Request rate above the configured per-minute hint"
            );
        }

        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(self.settings.timeout)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, url = %url, budget_remaining = usage.remaining(), "Received API response");

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .map(|body| body.message);
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        Ok(response.json().await?)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
