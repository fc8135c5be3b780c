mod aggregate;
pub mod handlers;
pub mod models;

pub use aggregate::aggregate_daily;
pub use models::{DailyForecast, DayBoundary, ForecastFeed};
