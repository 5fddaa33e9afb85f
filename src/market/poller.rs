use chrono::{DateTime, Local};
use log::{debug, error, info};
use metrics::{counter, gauge};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use super::{poll, MarketDataSource, MarketStatus, MarketView, PollOutcome};
use crate::display::MarketDisplay;
use crate::metrics::{METRIC_MARKET_LIQUIDITY, METRIC_MARKET_POLLS, METRIC_MARKET_POLL_FAILURES};

/// Owned exclusively by [`MarketDataPoller`].
#[derive(Debug, Default)]
pub struct PollState {
    timer: Option<JoinHandle<()>>,
    last_updated: Option<DateTime<Local>>,
}

/// Refreshes the live-stats region while it is visible.
///
/// Dormant until the region becomes visible; then polls immediately and on
/// every interval. Losing visibility disarms the interval, but fetches already
/// in flight still complete and are applied if the region is still attached.
pub struct MarketDataPoller {
    source: Arc<dyn MarketDataSource>,
    display: Arc<dyn MarketDisplay>,
    contract: String,
    interval: Duration,
    visibility_threshold: f64,
    state: Mutex<PollState>,
}

impl MarketDataPoller {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        display: Arc<dyn MarketDisplay>,
        contract: impl Into<String>,
        interval: Duration,
        visibility_threshold: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            display,
            contract: contract.into(),
            interval,
            visibility_threshold,
            state: Mutex::new(PollState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_armed(&self) -> bool {
        self.state().timer.is_some()
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.state().last_updated
    }

    /// Visibility handler fed with the visible fraction of the region.
    pub fn on_intersection(self: &Arc<Self>, visible_ratio: f64) {
        self.set_visible(visible_ratio >= self.visibility_threshold);
    }

    /// The only way the interval is armed or disarmed. At most one interval
    /// exists at any time.
    pub fn set_visible(self: &Arc<Self>, visible: bool) {
        let mut state = self.state();
        if visible {
            // Already armed: the running interval covers this visibility.
            if state.timer.is_some() {
                return;
            }
            debug!("Live stats visible, polling every {:?}", self.interval);
            self.spawn_poll();

            let this: Weak<Self> = Arc::downgrade(self);
            let period = self.interval;
            state.timer = Some(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(poller) = this.upgrade() else {
                        break;
                    };
                    poller.spawn_poll();
                }
            }));
        } else if let Some(timer) = state.timer.take() {
            debug!("Live stats hidden, polling paused");
            timer.abort();
        }
    }

    /// Fetches run detached so that disarming the interval never cancels one.
    fn spawn_poll(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_once().await;
        });
    }

    /// One poll tick. Failures degrade the region to "unavailable" and never
    /// propagate. Returns `None` when the fetch failed or the region is gone.
    pub async fn run_once(&self) -> Option<PollOutcome> {
        counter!(METRIC_MARKET_POLLS, 1);
        if self.display.is_attached() {
            self.display.show_status(&MarketStatus::Loading);
        }

        let result = poll(self.source.as_ref(), &self.contract).await;

        if !self.display.is_attached() {
            debug!("Live stats region gone, dropping poll result");
            return None;
        }

        let outcome = match result {
            Ok(PollOutcome::Live(snapshot)) => {
                gauge!(METRIC_MARKET_LIQUIDITY, snapshot.top().liquidity());
                self.display.show_status(&MarketStatus::Live(snapshot.activity));
                self.display.show_market(&MarketView::from_snapshot(&snapshot));
                Some(PollOutcome::Live(snapshot))
            }
            Ok(PollOutcome::NoLiquidity) => {
                info!("No liquidity for {} yet", self.contract);
                self.display.show_status(&MarketStatus::NoLiquidity);
                Some(PollOutcome::NoLiquidity)
            }
            Err(e) => {
                counter!(METRIC_MARKET_POLL_FAILURES, 1);
                error!("Market data for {} unavailable: {}", self.contract, e);
                self.display.show_status(&MarketStatus::Unavailable);
                None
            }
        };

        let now = Local::now();
        self.state().last_updated = Some(now);
        self.display.show_updated(now);
        outcome
    }
}

impl Drop for MarketDataPoller {
    fn drop(&mut self) {
        if let Some(timer) = self.state().timer.take() {
            timer.abort();
        }
    }
}
