pub mod handlers;
mod models;
mod service;

pub use models::CurrentConditions;
pub use service::{ReadMode, WeatherService};
