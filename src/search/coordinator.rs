use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::models::{SearchOutcome, SearchState, SearchSuggestion};
use crate::config::SearchConfig;
use crate::error::{ApiError, ErrorBody};

/// City lookup used by the coordinator
#[async_trait]
pub trait CitySearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchSuggestion>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub min_length: usize,
    pub debounce: Duration,
    pub limit: usize,
}

impl From<&SearchConfig> for SearchSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            min_length: config.min_length,
            debounce: Duration::from_millis(config.debounce_ms),
            limit: config.limit,
        }
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Debounced, cancellable city search.
///
/// Every `submit` or `clear` starts a new generation and cancels the token of
/// the previous one, so a pending debounce or an outstanding request is
/// abandoned rather than queued. State is only written by the generation that
/// is still current when it resolves.
pub struct SearchCoordinator<S> {
    search: Arc<S>,
    settings: SearchSettings,
    in_flight: Mutex<InFlight>,
    state: watch::Sender<SearchState>,
}

impl<S: CitySearch> SearchCoordinator<S> {
    pub fn new(search: Arc<S>, settings: SearchSettings) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            search,
            settings,
            in_flight: Mutex::new(InFlight {
                generation: 0,
                token: CancellationToken::new(),
            }),
            state,
        }
    }

    /// Feed one keystroke's worth of query text
    pub async fn submit(&self, query: &str) -> SearchOutcome {
        let query = query.trim().to_string();
        let (generation, token) = self.supersede();

        if query.chars().count() < self.settings.min_length {
            self.apply(generation, SearchState::Idle);
            return SearchOutcome::TooShort;
        }

        tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!(query = %query, "Search discarded during debounce");
                return SearchOutcome::Superseded;
            }
            _ = tokio::time::sleep(self.settings.debounce) => {}
        }

        if !self.apply(generation, SearchState::Searching { query: query.clone() }) {
            return SearchOutcome::Superseded;
        }

        tracing::debug!(query = %query, generation, "Search fired");
        let mut abandoned = AbandonGuard {
            coordinator: self,
            generation,
            armed: true,
        };

        let result = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(query = %query, generation, "In-flight search cancelled");
                return SearchOutcome::Superseded;
            }
            result = self.search.search(&query, self.settings.limit) => result,
        };

        let state = match result {
            Ok(mut suggestions) => {
                suggestions.truncate(self.settings.limit);
                SearchState::Ready { query, suggestions }
            }
            Err(err) => {
                tracing::warn!(query = %query, error = %err, "City search failed");
                SearchState::Failed {
                    query,
                    error: ErrorBody::from(&err),
                }
            }
        };

        abandoned.armed = false;
        if self.apply(generation, state.clone()) {
            SearchOutcome::Completed(state)
        } else {
            SearchOutcome::Superseded
        }
    }

    /// Drop suggestions and cancel anything outstanding
    pub fn clear(&self) {
        let (generation, _) = self.supersede();
        self.apply(generation, SearchState::Idle);
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }
}

impl<S> SearchCoordinator<S> {
    fn supersede(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock();
        in_flight.token.cancel();
        in_flight.generation += 1;
        in_flight.token = CancellationToken::new();
        (in_flight.generation, in_flight.token.clone())
    }

    /// Publish `state` if `generation` is still the latest; the lock is held
    /// across the check and the write so a newer submit cannot interleave
    fn apply(&self, generation: u64, state: SearchState) -> bool {
        let in_flight = self.in_flight.lock();
        if in_flight.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

/// Resets a still-current `Searching` state to idle when `submit` is dropped
/// before its request resolves
struct AbandonGuard<'a, S> {
    coordinator: &'a SearchCoordinator<S>,
    generation: u64,
    armed: bool,
}

impl<S> Drop for AbandonGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed && self.coordinator.apply(self.generation, SearchState::Idle) {
            tracing::debug!(generation = self.generation, "Search abandoned by caller");
        }
    }
}

impl<S> Drop for SearchCoordinator<S> {
    fn drop(&mut self) {
        self.in_flight.lock().token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::openweather::models::GeoLocation;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSearch {
        calls: Mutex<Vec<String>>,
        delays: HashMap<&'static str, Duration>,
    }

    impl FakeSearch {
        fn with_delays(delays: &[(&'static str, u64)]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delays: delays
                    .iter()
                    .map(|(q, ms)| (*q, Duration::from_millis(*ms)))
                    .collect(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    fn suggestion(name: &str) -> SearchSuggestion {
        SearchSuggestion::from(GeoLocation {
            name: name.to_string(),
            lat: 1.0,
            lon: 2.0,
            country: "GB".to_string(),
            state: None,
        })
    }

    #[async_trait]
    impl CitySearch for FakeSearch {
        async fn search(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<SearchSuggestion>, ApiError> {
            self.calls.lock().push(query.to_string());
            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            match query {
                "fail" => Err(ApiError::Timeout),
                "zzz" => Ok(Vec::new()),
                // more than asked for, to check the cap
                _ => Ok((0..limit + 2)
                    .map(|i| suggestion(&format!("{} {}", query, i)))
                    .collect()),
            }
        }
    }

    fn settings() -> SearchSettings {
        SearchSettings {
            min_length: 2,
            debounce: Duration::from_millis(500),
            limit: 5,
        }
    }

    fn coordinator(fake: Arc<FakeSearch>) -> Arc<SearchCoordinator<FakeSearch>> {
        Arc::new(SearchCoordinator::new(fake, settings()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_within_debounce_issue_one_call() {
        let fake = Arc::new(FakeSearch::default());
        let coordinator = coordinator(fake.clone());

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit("Lo").await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = coordinator.submit("Lon").await;

        assert_eq!(first.await.unwrap(), SearchOutcome::Superseded);
        assert!(matches!(
            second,
            SearchOutcome::Completed(SearchState::Ready { ref query, .. }) if query == "Lon"
        ));
        assert_eq!(fake.calls(), vec!["Lon".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submit_does_not_leave_searching() {
        let fake = Arc::new(FakeSearch::with_delays(&[("London", 5_000)]));
        let coordinator = coordinator(fake.clone());

        // caller gives up after the debounce, while the request is on the wire
        let result =
            tokio::time::timeout(Duration::from_millis(1_000), coordinator.submit("London")).await;

        assert!(result.is_err());
        assert_eq!(fake.calls(), vec!["London".to_string()]);
        assert_eq!(coordinator.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_never_fetches() {
        let fake = Arc::new(FakeSearch::default());
        let coordinator = coordinator(fake.clone());

        assert_eq!(coordinator.submit("L").await, SearchOutcome::TooShort);
        assert_eq!(coordinator.submit("  ").await, SearchOutcome::TooShort);
        assert!(fake.calls().is_empty());
        assert_eq!(coordinator.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_clears_suggestions_immediately() {
        let fake = Arc::new(FakeSearch::default());
        let coordinator = coordinator(fake.clone());

        coordinator.submit("London").await;
        assert_eq!(coordinator.state().suggestions().len(), 5);

        coordinator.submit("L").await;
        assert_eq!(coordinator.state(), SearchState::Idle);
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_earlier_search_never_overwrites_newer() {
        let fake = Arc::new(FakeSearch::with_delays(&[("Par", 2_000), ("Paris", 100)]));
        let coordinator = coordinator(fake.clone());

        let slow = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit("Par").await })
        };
        // past the debounce window: "Par" is on the wire
        tokio::time::sleep(Duration::from_millis(700)).await;
        let fast = coordinator.submit("Paris").await;

        // let the slow one's original deadline pass as well
        tokio::time::sleep(Duration::from_millis(3_000)).await;

        assert_eq!(slow.await.unwrap(), SearchOutcome::Superseded);
        assert!(matches!(fast, SearchOutcome::Completed(_)));
        assert_eq!(fake.calls(), vec!["Par".to_string(), "Paris".to_string()]);

        match coordinator.state() {
            SearchState::Ready { query, suggestions } => {
                assert_eq!(query, "Paris");
                assert!(suggestions[0].name.starts_with("Paris"));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_generation_is_not_applied() {
        let coordinator = coordinator(Arc::new(FakeSearch::default()));

        let (old, _) = coordinator.supersede();
        let (current, _) = coordinator.supersede();

        assert!(!coordinator.apply(old, SearchState::Searching { query: "old".to_string() }));
        assert_eq!(coordinator.state(), SearchState::Idle);
        assert!(coordinator.apply(current, SearchState::Searching { query: "new".to_string() }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_capped_at_limit_in_api_order() {
        let coordinator = coordinator(Arc::new(FakeSearch::default()));

        let outcome = coordinator.submit("Berlin").await;
        let SearchOutcome::Completed(state) = outcome else {
            panic!("search did not complete");
        };
        let names: Vec<_> = state.suggestions().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["Berlin 0", "Berlin 1", "Berlin 2", "Berlin 3", "Berlin 4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_results_and_failure_are_distinct() {
        let coordinator = coordinator(Arc::new(FakeSearch::default()));

        coordinator.submit("zzz").await;
        let empty = coordinator.state();
        assert!(empty.is_empty_result());

        coordinator.submit("fail").await;
        match coordinator.state() {
            SearchState::Failed { error, .. } => assert_eq!(error.kind, ErrorKind::Timeout),
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_outstanding_search() {
        let fake = Arc::new(FakeSearch::with_delays(&[("Rome", 2_000)]));
        let coordinator = coordinator(fake.clone());

        let pending = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit("Rome").await })
        };
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(coordinator.state(), SearchState::Searching { query: "Rome".to_string() });

        coordinator.clear();

        assert_eq!(pending.await.unwrap(), SearchOutcome::Superseded);
        assert_eq!(coordinator.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_observe_transitions() {
        let coordinator = coordinator(Arc::new(FakeSearch::default()));
        let mut rx = coordinator.subscribe();

        coordinator.submit("Oslo").await;

        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow(), SearchState::Ready { .. }));
    }
}
