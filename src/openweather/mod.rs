mod client;
pub mod models;
mod retry;

pub use client::{ApiSettings, OpenWeatherClient};
pub use models::WeatherCondition;
pub use retry::RetryPolicy;
