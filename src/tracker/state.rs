use std::time::Instant;

use log::error;
use serde::{Deserialize, Serialize};

use super::session::Session;

/// Observable tracking condition, surfaced by the status indicator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingStatus {
    /// Tracking is on and an interval is accruing.
    Active,
    /// Tracking is on but the page is inactive and accrual is suspended.
    Idle,
    /// The user switched tracking off.
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub status: TrackingStatus,
    pub tracking_enabled: bool,
    pub page_active: bool,
    pub track_when_inactive: bool,
    pub total_ms: u64,
}

/// The full tracker state: the session accumulator plus the flags that
/// decide whether it should be accruing.
#[derive(Debug, Clone)]
pub struct TrackerState {
    pub(crate) session: Session,
    pub tracking_enabled: bool,
    pub page_active: bool,
    pub track_when_inactive: bool,
    pub(crate) finished: bool,
}

impl TrackerState {
    pub fn new(tracking_enabled: bool, track_when_inactive: bool) -> Self {
        Self {
            session: Session::new(),
            tracking_enabled,
            // The page is assumed active at load.
            page_active: true,
            track_when_inactive,
            finished: false,
        }
    }

    pub fn should_accrue(&self) -> bool {
        !self.finished && self.tracking_enabled && (self.page_active || self.track_when_inactive)
    }

    pub fn is_accruing(&self) -> bool {
        self.session.is_open()
    }

    /// Bring the accumulator in line with the flags: open an interval when
    /// accrual should be on, close (and report flushable seconds) when it
    /// should be off. Every event handler funnels through here, which is
    /// what makes redundant event delivery harmless: a second blur after
    /// the interval already closed finds nothing left to do.
    pub fn reconcile(&mut self, now: Instant) -> Option<u64> {
        if self.should_accrue() {
            if !self.session.is_open() {
                if let Err(err) = self.session.open(now) {
                    debug_assert!(false, "reconcile opened an open interval: {err}");
                    error!("tracker state out of sync on open: {err}");
                }
            }
            None
        } else if self.session.is_open() {
            match self.session.close(now) {
                Ok(seconds) if seconds > 0 => Some(seconds),
                Ok(_) => None,
                Err(err) => {
                    debug_assert!(false, "reconcile closed a closed interval: {err}");
                    error!("tracker state out of sync on close: {err}");
                    None
                }
            }
        } else {
            None
        }
    }

    pub fn status(&self) -> TrackingStatus {
        if !self.tracking_enabled {
            TrackingStatus::Paused
        } else if self.session.is_open() {
            TrackingStatus::Active
        } else {
            TrackingStatus::Idle
        }
    }

    pub fn snapshot(&self, now: Instant) -> TrackerSnapshot {
        TrackerSnapshot {
            status: self.status(),
            tracking_enabled: self.tracking_enabled,
            page_active: self.page_active,
            track_when_inactive: self.track_when_inactive,
            total_ms: self.session.current_total_ms(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn reconcile_opens_when_enabled_and_active() {
        let mut state = TrackerState::new(true, false);
        assert!(state.reconcile(Instant::now()).is_none());
        assert!(state.is_accruing());
        assert_eq!(state.status(), TrackingStatus::Active);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, false);

        state.reconcile(t0);
        state.reconcile(t0 + Duration::from_secs(1));
        assert!(state.is_accruing());

        // Redundant blur + visibilitychange: the second close finds the
        // interval already closed and does nothing.
        state.page_active = false;
        let first = state.reconcile(t0 + Duration::from_secs(10));
        let second = state.reconcile(t0 + Duration::from_secs(10));
        assert_eq!(first, Some(10));
        assert_eq!(second, None);
        assert_eq!(state.status(), TrackingStatus::Idle);
    }

    #[test]
    fn inactive_page_keeps_accruing_with_preference() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, true);
        state.reconcile(t0);

        state.page_active = false;
        assert!(state.reconcile(t0 + Duration::from_secs(5)).is_none());
        assert!(state.is_accruing());
        assert_eq!(state.status(), TrackingStatus::Active);
    }

    #[test]
    fn preference_flip_while_inactive_toggles_accrual() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, true);
        state.reconcile(t0);
        state.page_active = false;
        state.reconcile(t0 + Duration::from_secs(1));
        assert!(state.is_accruing());

        state.track_when_inactive = false;
        let flushed = state.reconcile(t0 + Duration::from_secs(4));
        assert_eq!(flushed, Some(4));
        assert!(!state.is_accruing());

        state.track_when_inactive = true;
        state.reconcile(t0 + Duration::from_secs(30));
        assert!(state.is_accruing());
    }

    #[test]
    fn disabling_reports_flushable_seconds() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, false);
        state.reconcile(t0);

        state.tracking_enabled = false;
        let flushed = state.reconcile(t0 + Duration::from_secs(20));
        assert_eq!(flushed, Some(20));
        assert_eq!(state.status(), TrackingStatus::Paused);
    }

    #[test]
    fn short_interval_flushes_nothing_but_keeps_the_time() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, false);
        state.reconcile(t0);

        state.page_active = false;
        let flushed = state.reconcile(t0 + Duration::from_millis(800));
        assert_eq!(flushed, None);

        let snap = state.snapshot(t0 + Duration::from_millis(800));
        assert_eq!(snap.total_ms, 800);
    }

    #[test]
    fn finished_state_never_accrues() {
        let t0 = Instant::now();
        let mut state = TrackerState::new(true, false);
        state.reconcile(t0);

        state.finished = true;
        state.reconcile(t0 + Duration::from_secs(3));
        assert!(!state.is_accruing());
        state.page_active = true;
        state.reconcile(t0 + Duration::from_secs(4));
        assert!(!state.is_accruing());
    }
}
