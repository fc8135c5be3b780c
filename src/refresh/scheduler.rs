use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    /// The countdown reached zero
    Interval,
    /// Requested by the user; caches are invalidated first
    Manual,
}

/// Receives refresh callbacks
#[async_trait]
pub trait RefreshHandler: Send + Sync {
    async fn on_refresh(&self, trigger: RefreshTrigger);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub armed: bool,
    pub interval_ms: u64,
    /// Countdown to the next fire in whole seconds; absent while idle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct TimerState {
    /// The only source of truth for when the next refresh happens
    next_fire: Option<Instant>,
    last_refreshed: Option<DateTime<Utc>>,
}

struct Shared {
    interval: Duration,
    state: Mutex<TimerState>,
    wake: Notify,
    handler: Arc<dyn RefreshHandler>,
}

impl Shared {
    async fn fire(&self, trigger: RefreshTrigger) {
        tracing::info!(trigger = ?trigger, "Refreshing weather data");
        self.handler.on_refresh(trigger).await;
        self.state.lock().last_refreshed = Some(Utc::now());
    }
}

/// Periodic refresh with a manual override.
///
/// Idle until [`arm`](Self::arm)ed. While armed, the handler fires each time
/// `next_fire` passes and `next_fire` moves a full interval ahead. The
/// countdown reported by [`status`](Self::status) is derived from the same
/// instant, so it cannot drift from the actual fire time.
pub struct RefreshScheduler {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn start(interval: Duration, handler: Arc<dyn RefreshHandler>) -> Self {
        let shared = Arc::new(Shared {
            interval,
            state: Mutex::new(TimerState::default()),
            wake: Notify::new(),
            handler,
        });

        let task = tokio::spawn(run(Arc::clone(&shared)));

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Refresh scheduler started");

        Self { shared, task }
    }

    /// Start (or restart) the countdown from a full interval
    pub fn arm(&self) {
        self.shared.state.lock().next_fire = Some(Instant::now() + self.shared.interval);
        self.shared.wake.notify_one();
        tracing::debug!("Refresh scheduler armed");
    }

    /// Stop the countdown; nothing fires until the next `arm`
    pub fn disarm(&self) {
        self.shared.state.lock().next_fire = None;
        self.shared.wake.notify_one();
        tracing::debug!("Refresh scheduler disarmed");
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().next_fire.is_some()
    }

    /// Fire the handler now and restart the countdown.
    /// Returns `false` without firing while idle.
    pub async fn refresh_now(&self) -> bool {
        {
            let mut state = self.shared.state.lock();
            if state.next_fire.is_none() {
                return false;
            }
            state.next_fire = Some(Instant::now() + self.shared.interval);
        }
        self.shared.wake.notify_one();

        self.shared.fire(RefreshTrigger::Manual).await;
        true
    }

    pub fn status(&self) -> RefreshStatus {
        let state = self.shared.state.lock();
        let remaining_ms = state.next_fire.map(|at| {
            let ms = at.saturating_duration_since(Instant::now()).as_millis() as u64;
            // 1 s display ticks
            ms.div_ceil(1000) * 1000
        });

        RefreshStatus {
            armed: state.next_fire.is_some(),
            interval_ms: self.shared.interval.as_millis() as u64,
            remaining_ms,
            last_refreshed: state.last_refreshed,
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(shared: Arc<Shared>) {
    loop {
        let next_fire = shared.state.lock().next_fire;

        let Some(deadline) = next_fire else {
            shared.wake.notified().await;
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                let due = {
                    let mut state = shared.state.lock();
                    match state.next_fire {
                        Some(at) if at <= Instant::now() => {
                            state.next_fire = Some(Instant::now() + shared.interval);
                            true
                        }
                        _ => false,
                    }
                };
                if due {
                    shared.fire(RefreshTrigger::Interval).await;
                }
            }
            _ = shared.wake.notified() => {}
        }
    }
}
