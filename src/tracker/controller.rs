use std::{env, sync::Arc, time::Duration};

use log::{info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::{Clock, SystemClock},
    settings::SettingsStore,
    store::UsageStore,
};

use super::{TrackerSnapshot, TrackerState};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const FLUSH_EVERY_TICKS: u32 = 60;

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The focus/tracking state machine.
///
/// Hosts feed it visibility changes, the user's pause/resume toggle, the
/// track-when-inactive preference and the final teardown; it keeps the
/// session accumulator in line, publishes a snapshot per tick for the
/// live counter, and flushes closed spans to the usage store.
///
/// Every entry point is idempotent: browser event sources deliver
/// redundantly (a blur and a visibilitychange for one transition), and a
/// repeated event must not double-open or double-close an interval.
#[derive(Clone)]
pub struct UsageTracker {
    state: Arc<Mutex<TrackerState>>,
    store: Arc<dyn UsageStore>,
    settings: Arc<SettingsStore>,
    clock: Arc<dyn Clock>,
    snapshot_tx: Arc<watch::Sender<TrackerSnapshot>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    flush_every_ticks: u32,
}

impl UsageTracker {
    pub fn new(store: Arc<dyn UsageStore>, settings: Arc<SettingsStore>) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn UsageStore>,
        settings: Arc<SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let debug_mode = env::var("LERNZEIT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let track_when_inactive = settings.track_when_inactive();
        let state = TrackerState::new(true, track_when_inactive);
        let (snapshot_tx, _) = watch::channel(state.snapshot(clock.now()));

        Self {
            state: Arc::new(Mutex::new(state)),
            store,
            settings,
            clock,
            snapshot_tx: Arc::new(snapshot_tx),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: TICK_INTERVAL,
            flush_every_ticks: if debug_mode { 1 } else { FLUSH_EVERY_TICKS },
        }
    }

    /// Seed today's counter from the store and begin tracking. The page
    /// is assumed active at load, so the first interval opens immediately
    /// unless tracking is disabled. A store that cannot be read is not
    /// fatal; the counter starts at zero.
    pub async fn start(&self) {
        let today = self.clock.today();
        let seed_seconds = match self.store.read_daily_totals().await {
            Ok(totals) => totals.get(&today).copied().unwrap_or(0),
            Err(err) => {
                warn!("could not read persisted usage, counter starts at zero: {err:#}");
                0
            }
        };

        {
            let mut state = self.state.lock().await;
            state.session.seed(seed_seconds.saturating_mul(1000));
            state.reconcile(self.clock.now());
            self.publish(&state);
        }

        info!("usage tracking started with {seed_seconds}s already recorded for {today}");
        self.update_ticker().await;
    }

    /// User-level pause/resume toggle.
    pub async fn set_tracking_enabled(&self, enabled: bool) {
        self.apply(|state| state.tracking_enabled = enabled).await;
    }

    /// Flip the continue-in-background preference and persist it. Applies
    /// immediately: flipping it off while the page is inactive closes the
    /// running interval, flipping it on reopens one.
    pub async fn set_track_when_inactive(&self, enabled: bool) {
        if let Err(err) = self.settings.set_track_when_inactive(enabled) {
            warn!("could not persist track-when-inactive preference: {err:#}");
        }
        self.apply(|state| state.track_when_inactive = enabled).await;
    }

    /// Page visibility and window focus/blur both funnel here.
    pub async fn on_visibility_change(&self, active: bool) {
        self.apply(|state| state.page_active = active).await;
    }

    /// Final transition at page teardown: close, flush best-effort, stop
    /// the ticker. Further events are no-ops.
    pub async fn on_teardown(&self) {
        self.apply(|state| state.finished = true).await;
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.state.lock().await.snapshot(self.clock.now())
    }

    pub async fn current_total_ms(&self) -> u64 {
        self.snapshot().await.total_ms
    }

    /// Live-counter feed: a fresh snapshot is published on every state
    /// transition and once per tick while accruing.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    async fn apply<F>(&self, mutate: F)
    where
        F: FnOnce(&mut TrackerState),
    {
        let now = self.clock.now();
        let flush = {
            let mut state = self.state.lock().await;
            mutate(&mut state);
            let flush = state.reconcile(now);
            self.publish(&state);
            flush
        };

        if let Some(seconds) = flush {
            let date = self.clock.today();
            if let Err(err) = self.store.append_usage(date, seconds).await {
                // The local counter is not rolled back; a buffering store
                // keeps the delta for the next attempt.
                warn!("usage flush failed ({seconds}s for {date}): {err:#}");
            }
        }

        self.update_ticker().await;
    }

    fn publish(&self, state: &TrackerState) {
        self.snapshot_tx.send_replace(state.snapshot(self.clock.now()));
    }

    /// The tick loop must never fire against a closed interval, so it is
    /// cancelled whenever accrual stops and respawned on the way back in.
    async fn update_ticker(&self) {
        let accruing = self.state.lock().await.is_accruing();
        let mut guard = self.ticker.lock().await;

        if accruing {
            let running = guard.as_ref().is_some_and(|t| !t.handle.is_finished());
            if !running {
                *guard = Some(self.spawn_ticker());
            }
        } else if let Some(ticker) = guard.take() {
            ticker.cancel.cancel();
        }
    }

    fn spawn_ticker(&self) -> Ticker {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let state = self.state.clone();
        let store = self.store.clone();
        let clock = self.clock.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        let tick_interval = self.tick_interval;
        let flush_every = self.flush_every_ticks.max(1);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let flush = {
                            let mut state = state.lock().await;
                            if !state.is_accruing() {
                                break;
                            }
                            ticks = ticks.wrapping_add(1);
                            let flush = if ticks % flush_every == 0 {
                                let seconds = state.session.checkpoint(clock.now());
                                (seconds > 0).then_some(seconds)
                            } else {
                                None
                            };
                            snapshot_tx.send_replace(state.snapshot(clock.now()));
                            flush
                        };

                        // Periodic flushes never hold up the tick loop.
                        if let Some(seconds) = flush {
                            let store = store.clone();
                            let date = clock.today();
                            tokio::spawn(async move {
                                if let Err(err) = store.append_usage(date, seconds).await {
                                    warn!("periodic usage flush failed ({seconds}s for {date}): {err:#}");
                                }
                            });
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        Ticker { cancel, handle }
    }

    #[cfg(test)]
    pub(crate) fn set_cadence(&mut self, tick_interval: Duration, flush_every_ticks: u32) {
        self.tick_interval = tick_interval;
        self.flush_every_ticks = flush_every_ticks;
    }
}
