mod coordinator;
pub mod handlers;
mod models;

pub use coordinator::{CitySearch, SearchCoordinator, SearchSettings};
pub use models::{SearchOutcome, SearchState, SearchSuggestion};
