use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Rolling one-minute view of upstream calls against the rate-limit hint.
///
/// Advisory only: an over-budget call is reported to the caller, which logs
/// it and sends anyway. The remote API enforces the real limit.
pub struct RequestBudget {
    per_minute: u32,
    sent: Mutex<VecDeque<Instant>>,
}

/// Window usage as seen by one recorded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetUsage {
    /// Calls in the last minute, this one included
    pub in_window: u32,
    pub per_minute: u32,
    /// Until the oldest call in the window ages out
    pub frees_in: Duration,
}

impl BudgetUsage {
    pub fn is_over(&self) -> bool {
        self.in_window > self.per_minute
    }

    pub fn remaining(&self) -> u32 {
        self.per_minute.saturating_sub(self.in_window)
    }
}

impl RequestBudget {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a call made now
    pub fn record_call(&self) -> BudgetUsage {
        let now = Instant::now();
        let mut sent = self.sent.lock();
        while sent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= WINDOW)
        {
            sent.pop_front();
        }
        sent.push_back(now);

        let frees_in = sent
            .front()
            .map(|oldest| WINDOW.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or_default();

        BudgetUsage {
            in_window: u32::try_from(sent.len()).unwrap_or(u32::MAX),
            per_minute: self.per_minute,
            frees_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_over_hint_are_flagged() {
        let budget = RequestBudget::new(3);
        assert_eq!(budget.record_call().remaining(), 2);
        budget.record_call();
        let third = budget.record_call();
        assert!(!third.is_over());
        assert_eq!(third.remaining(), 0);

        let fourth = budget.record_call();
        assert!(fourth.is_over());
        assert_eq!(fourth.in_window, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rolls_instead_of_resetting() {
        let budget = RequestBudget::new(2);
        budget.record_call();
        tokio::time::advance(Duration::from_secs(40)).await;
        budget.record_call();

        // first call is 50s old, still inside the minute
        tokio::time::advance(Duration::from_secs(10)).await;
        let usage = budget.record_call();
        assert!(usage.is_over());
        assert_eq!(usage.frees_in, Duration::from_secs(10));

        // first call has aged out, the other two remain
        tokio::time::advance(Duration::from_secs(10)).await;
        let usage = budget.record_call();
        assert_eq!(usage.in_window, 3);
        assert_eq!(usage.frees_in, Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_hint_flags_every_call() {
        let budget = RequestBudget::new(0);
        assert!(budget.record_call().is_over());
    }
}
