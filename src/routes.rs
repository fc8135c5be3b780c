use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::forecast::handlers as forecast_handlers;
use crate::location::handlers as location_handlers;
use crate::preferences::handlers as preferences_handlers;
use crate::refresh::handlers as refresh_handlers;
use crate::search::handlers as search_handlers;
use crate::weather::handlers as weather_handlers;
use crate::AppState;

/// City search routes
fn search_routes() -> Router<AppState> {
    Router::new().route(
        "/search",
        get(search_handlers::search).delete(search_handlers::clear_search),
    )
}

/// Active location routes
fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/location",
            get(location_handlers::get_location)
                .put(location_handlers::select_location)
                .delete(location_handlers::clear_location),
        )
        .route(
            "/location/current",
            post(location_handlers::use_current_location),
        )
}

/// Weather data for the active location
fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/weather", get(weather_handlers::get_weather))
        .route(
            "/forecast/daily",
            get(forecast_handlers::get_daily_forecast),
        )
}

fn refresh_routes() -> Router<AppState> {
    Router::new().route(
        "/refresh",
        get(refresh_handlers::refresh_status).post(refresh_handlers::refresh_now),
    )
}

fn preferences_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/preferences",
            get(preferences_handlers::get_preferences).put(preferences_handlers::update_preferences),
        )
        .route(
            "/preferences/recent",
            delete(preferences_handlers::clear_recent_searches),
        )
}

/// Build the complete application router
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(weather_handlers::health))
        .route("/health", get(weather_handlers::health))
        .merge(search_routes())
        .merge(location_routes())
        .merge(weather_routes())
        .merge(refresh_routes())
        .merge(preferences_routes())
}
