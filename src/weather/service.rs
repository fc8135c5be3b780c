use async_trait::async_trait;
use dashmap::DashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::models::CurrentConditions;
use crate::cache::{normalize_cache_key, start_cache_cleanup_task, Lookup, ResponseCache};
use crate::config::CacheConfig;
use crate::error::ApiError;
use crate::forecast::ForecastFeed;
use crate::location::Coordinates;
use crate::openweather::OpenWeatherClient;
use crate::search::{CitySearch, SearchSuggestion};
use crate::units::Units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Search,
    Current,
    Forecast,
}

/// (endpoint kind, coordinates or query, units)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EndpointKind,
    pub subject: String,
    pub units: Option<Units>,
}

impl CacheKey {
    fn new(kind: EndpointKind, subject: String, units: Option<Units>) -> Self {
        Self { kind, subject, units }
    }
}

/// Whether a read may be answered from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Cached,
    /// Bypass the cache and refetch; the result still repopulates it
    Force,
}

type Cache<T> = Arc<ResponseCache<CacheKey, Arc<T>>>;

/// Cached read-through over the weather API
#[derive(Clone)]
pub struct WeatherService {
    client: OpenWeatherClient,
    current: Cache<CurrentConditions>,
    forecast: Cache<ForecastFeed>,
    search: Cache<Vec<SearchSuggestion>>,
    revalidating: Arc<DashSet<CacheKey>>,
}

impl WeatherService {
    pub fn new(client: OpenWeatherClient, config: &CacheConfig) -> Self {
        let fresh_for = Duration::from_millis(config.stale_time_ms);
        let expires_after = Duration::from_millis(config.expiry_ms);

        Self {
            client,
            current: Arc::new(ResponseCache::new(fresh_for, expires_after)),
            forecast: Arc::new(ResponseCache::new(fresh_for, expires_after)),
            search: Arc::new(ResponseCache::new(fresh_for, expires_after)),
            revalidating: Arc::new(DashSet::new()),
        }
    }

    /// Spawn the periodic expiry sweep for every cache
    pub fn start_cleanup(&self) {
        start_cache_cleanup_task(Arc::clone(&self.current), "current");
        start_cache_cleanup_task(Arc::clone(&self.forecast), "forecast");
        start_cache_cleanup_task(Arc::clone(&self.search), "search");
    }

    pub async fn current(
        &self,
        coords: Coordinates,
        units: Units,
        mode: ReadMode,
    ) -> Result<Arc<CurrentConditions>, ApiError> {
        let key = CacheKey::new(EndpointKind::Current, coords.cache_subject(), Some(units));
        let client = self.client.clone();

        self.read_through(&self.current, key, mode, move || {
            let client = client.clone();
            async move {
                let raw = client.current_weather(coords, units).await?;
                CurrentConditions::from_response(raw, units)
            }
        })
        .await
    }

    pub async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
        mode: ReadMode,
    ) -> Result<Arc<ForecastFeed>, ApiError> {
        let key = CacheKey::new(EndpointKind::Forecast, coords.cache_subject(), Some(units));
        let client = self.client.clone();

        self.read_through(&self.forecast, key, mode, move || {
            let client = client.clone();
            async move {
                let raw = client.forecast(coords, units).await?;
                Ok::<_, ApiError>(ForecastFeed::from(raw))
            }
        })
        .await
    }

    /// City search memoized by (normalized query, limit)
    pub async fn search_cities(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Arc<Vec<SearchSuggestion>>, ApiError> {
        let query = query.trim().to_string();
        let key = CacheKey::new(
            EndpointKind::Search,
            format!("{}|{}", normalize_cache_key(&query), limit),
            None,
        );
        let client = self.client.clone();

        self.read_through(&self.search, key, ReadMode::Cached, move || {
            let client = client.clone();
            let query = query.clone();
            async move {
                let locations = client.search_cities(&query, limit).await?;
                Ok::<_, ApiError>(locations.into_iter().map(SearchSuggestion::from).collect())
            }
        })
        .await
    }

    /// Drop every cached response; in-progress fetches will not repopulate
    pub fn invalidate_all(&self) -> usize {
        let removed = self.current.invalidate_all()
            + self.forecast.invalidate_all()
            + self.search.invalidate_all();
        tracing::info!(removed, "Invalidated all cached responses");
        removed
    }

    async fn read_through<T, F, Fut>(
        &self,
        cache: &Cache<T>,
        key: CacheKey,
        mode: ReadMode,
        fetch: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        if mode == ReadMode::Cached {
            match cache.get(&key) {
                Lookup::Fresh(value) => {
                    tracing::debug!(key = ?key, "Cache hit");
                    return Ok(value);
                }
                Lookup::Stale(value) => {
                    tracing::debug!(key = ?key, "Serving stale entry, revalidating");
                    self.revalidate(Arc::clone(cache), key, fetch);
                    return Ok(value);
                }
                Lookup::Miss => tracing::debug!(key = ?key, "Cache miss"),
            }
        }

        let epoch = cache.epoch();
        let value = Arc::new(fetch().await?);
        cache.insert_if_current(epoch, key, Arc::clone(&value));
        Ok(value)
    }

    /// Background refetch of a stale entry; at most one per key
    fn revalidate<T, F, Fut>(&self, cache: Cache<T>, key: CacheKey, fetch: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        if !self.revalidating.insert(key.clone()) {
            return;
        }

        let revalidating = Arc::clone(&self.revalidating);
        let epoch = cache.epoch();

        tokio::spawn(async move {
            match fetch().await {
                Ok(value) => {
                    if !cache.insert_if_current(epoch, key.clone(), Arc::new(value)) {
                        tracing::debug!(key = ?key, "Discarding revalidation after invalidation");
                    }
                }
                Err(err) => {
                    tracing::warn!(key = ?key, error = %err, "Background revalidation failed");
                }
            }
            revalidating.remove(&key);
        });
    }
}

#[async_trait]
impl CitySearch for WeatherService {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchSuggestion>, ApiError> {
        Ok(self.search_cities(query, limit).await?.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_budget::RequestBudget;
    use crate::error::ErrorKind;
    use crate::openweather::{ApiSettings, RetryPolicy};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str, cache: CacheConfig) -> WeatherService {
        let client = OpenWeatherClient::new(
            reqwest::Client::new(),
            ApiSettings {
                api_key: "test_key".to_string(),
                weather_base_url: base_url.to_string(),
                geo_base_url: base_url.to_string(),
                timeout: Duration::from_secs(5),
                language: "en".to_string(),
            },
            Arc::new(RequestBudget::new(60)),
            RetryPolicy::none(),
        );
        WeatherService::new(client, &cache)
    }

    fn london() -> Coordinates {
        Coordinates { lat: 51.5074, lon: -0.1278 }
    }

    fn current_body(temp: f64) -> serde_json::Value {
        serde_json::json!({
            "coord": {"lat": 51.5074, "lon": -0.1278},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": temp, "feels_like": temp, "temp_min": temp, "temp_max": temp,
                     "pressure": 1015, "humidity": 60},
            "wind": {"speed": 3.0, "deg": 90},
            "dt": 1710072000,
            "sys": {"country": "GB", "sunrise": 1710051600, "sunset": 1710093600},
            "timezone": 0,
            "name": "London"
        })
    }

    async fn mount_current(server: &MockServer, temp: f64, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body(temp)))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fresh_entry_served_from_cache() {
        let server = MockServer::start().await;
        mount_current(&server, 12.0, 1).await;

        let service = service(&server.uri(), CacheConfig::default());
        let first = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        let second = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_units_are_part_of_the_key() {
        let server = MockServer::start().await;
        mount_current(&server, 12.0, 2).await;

        let service = service(&server.uri(), CacheConfig::default());
        service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        service.current(london(), Units::Imperial, ReadMode::Cached).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_network_read() {
        let server = MockServer::start().await;
        mount_current(&server, 12.0, 2).await;

        let service = service(&server.uri(), CacheConfig::default());
        let before = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        assert_eq!(service.invalidate_all(), 1);
        let after = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_force_bypasses_cache() {
        let server = MockServer::start().await;
        mount_current(&server, 12.0, 2).await;

        let service = service(&server.uri(), CacheConfig::default());
        service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        service.current(london(), Units::Metric, ReadMode::Force).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_entry_served_then_revalidated() {
        let server = MockServer::start().await;
        mount_current(&server, 12.0, 2).await;

        let service = service(
            &server.uri(),
            CacheConfig {
                stale_time_ms: 10,
                expiry_ms: 60_000,
            },
        );
        let first = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let stale = service.current(london(), Units::Metric, ReadMode::Cached).await.unwrap();
        assert!(Arc::ptr_eq(&first, &stale));

        // the background refetch replaces the cached value
        let key = CacheKey::new(
            EndpointKind::Current,
            london().cache_subject(),
            Some(Units::Metric),
        );
        for _ in 0..400 {
            let cached = match service.current.get(&key) {
                Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
                Lookup::Miss => None,
            };
            if cached.is_some_and(|value| !Arc::ptr_eq(&first, &value)) {
                let requests = server.received_requests().await.unwrap_or_default();
                assert_eq!(requests.len(), 2);
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stale entry was never revalidated");
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let service = service(&server.uri(), CacheConfig::default());
        for _ in 0..2 {
            let err = service
                .current(london(), Units::Metric, ReadMode::Cached)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_search_memoized_by_query_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/direct"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "London", "lat": 51.5074, "lon": -0.1278, "country": "GB"}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let service = service(&server.uri(), CacheConfig::default());
        let a = CitySearch::search(&service, "London", 5).await.unwrap();
        let b = CitySearch::search(&service, "London", 5).await.unwrap();
        // different limit, different key
        CitySearch::search(&service, "London", 3).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a[0].display_name, "London, GB");
    }

    #[tokio::test]
    async fn test_forecast_feed_built_from_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [
                    {"dt": 1710028800,
                     "main": {"temp": 5.0, "feels_like": 3.0, "temp_min": 5.0, "temp_max": 5.0, "pressure": 1000, "humidity": 80},
                     "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10n"}],
                     "wind": {"speed": 2.0}, "pop": 0.4},
                    {"dt": 1710039600,
                     "main": {"temp": 6.0, "feels_like": 4.0, "temp_min": 6.0, "temp_max": 6.0, "pressure": 1000, "humidity": 82},
                     "weather": [],
                     "wind": {"speed": 2.5}}
                ],
                "city": {"name": "London", "coord": {"lat": 51.5074, "lon": -0.1278}, "country": "GB", "timezone": 3600}
            })))
            .mount(&server)
            .await;

        let service = service(&server.uri(), CacheConfig::default());
        let feed = service.forecast(london(), Units::Metric, ReadMode::Cached).await.unwrap();

        assert_eq!(feed.samples.len(), 1);
        assert_eq!(feed.samples[0].precipitation_probability, 0.4);
        assert_eq!(feed.utc_offset().local_minus_utc(), 3600);
    }
}
