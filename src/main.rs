mod api_budget;
mod cache;
mod config;
mod dashboard;
mod error;
mod extractors;
mod forecast;
mod location;
mod openweather;
mod preferences;
mod refresh;
mod routes;
mod search;
mod units;
mod weather;

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError};
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api_budget::RequestBudget;
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::location::{Geolocator, HomeLocation};
use crate::openweather::{ApiSettings, OpenWeatherClient, RetryPolicy};
use crate::preferences::PreferenceStore;
use crate::refresh::RefreshScheduler;
use crate::search::{SearchCoordinator, SearchSettings};
use crate::weather::WeatherService;

/// Shared HTTP client configuration
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Ceiling for a whole inbound request, upstream retries included
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub search: Arc<SearchCoordinator<WeatherService>>,
    pub scheduler: Arc<RefreshScheduler>,
    pub preferences: Arc<PreferenceStore>,
    pub geolocator: Arc<dyn Geolocator>,
    pub config: Arc<AppConfig>,
}

/// Create shared HTTP client with connection pooling.
/// Per-request timeouts are applied by the weather client.
fn create_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

/// Wire every service together around one HTTP client
pub async fn build_state(config: AppConfig, http_client: Client) -> AppState {
    let budget = Arc::new(RequestBudget::new(config.rate_limit_per_minute));
    let client = OpenWeatherClient::new(
        http_client,
        ApiSettings::from(&config),
        budget,
        RetryPolicy::from(&config.retry),
    );
    let weather = WeatherService::new(client, &config.cache);

    let preferences = Arc::new(PreferenceStore::new(
        config.preferences_path.clone(),
        config.default_units,
    ));
    if let Err(e) = preferences.load().await {
        tracing::warn!(error = %e, path = %config.preferences_path, "Could not read preferences, using defaults");
    }
    let units = preferences.units().await;

    let dashboard = Arc::new(Dashboard::new(weather.clone(), units, &config.forecast));
    let search = Arc::new(SearchCoordinator::new(
        Arc::new(weather),
        SearchSettings::from(&config.search),
    ));
    let scheduler = Arc::new(RefreshScheduler::start(
        config.refresh_interval(),
        dashboard.clone(),
    ));
    let geolocator: Arc<dyn Geolocator> = Arc::new(HomeLocation::new(config.home));

    AppState {
        dashboard,
        search,
        scheduler,
        preferences,
        geolocator,
        config: Arc::new(config),
    }
}

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", err),
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weatherdash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!(
        units = %config.default_units,
        refresh_interval_ms = config.refresh_interval_ms,
        "Configuration loaded successfully"
    );

    let http_client = create_http_client()?;
    tracing::debug!("Shared HTTP client created");

    let addr = format!("{}:{}", config.host, config.port);
    let state = build_state(config, http_client).await;
    state.dashboard.weather().start_cleanup();

    let app = routes::build_router()
        .layer(
            ServiceBuilder::new()
                // Handle timeout errors
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
