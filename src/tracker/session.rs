use std::time::Instant;

use log::warn;

use crate::error::{TrackerError, TrackerResult};

/// In-memory bookkeeping for the page-lifetime usage session.
///
/// At most one interval is open at a time, anchored on a monotonic
/// `Instant`. Closing (or checkpointing) an interval folds the elapsed
/// span into `accumulated_ms` and into `unflushed_ms`; flushes drain
/// `unflushed_ms` in whole seconds and keep the sub-second remainder, so
/// frequent short intervals never undercount the persisted total.
#[derive(Debug, Clone, Default)]
pub struct Session {
    interval_start: Option<Instant>,
    accumulated_ms: u64,
    unflushed_ms: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the persisted starting total (milliseconds) at load time.
    pub fn seed(&mut self, accumulated_ms: u64) {
        self.accumulated_ms = accumulated_ms;
    }

    pub fn is_open(&self) -> bool {
        self.interval_start.is_some()
    }

    pub fn open(&mut self, now: Instant) -> TrackerResult<()> {
        if self.interval_start.is_some() {
            return Err(TrackerError::IntervalAlreadyOpen);
        }
        self.interval_start = Some(now);
        Ok(())
    }

    /// Close the open interval and return the whole seconds now due for
    /// persistence. The sub-second remainder stays in `unflushed_ms`.
    pub fn close(&mut self, now: Instant) -> TrackerResult<u64> {
        let start = self
            .interval_start
            .take()
            .ok_or(TrackerError::IntervalNotOpen)?;
        self.fold(start, now);
        Ok(self.drain_whole_seconds())
    }

    /// Flush mid-interval: fold the elapsed span, re-anchor at `now`, and
    /// return the whole seconds due. Returns 0 when no interval is open.
    pub fn checkpoint(&mut self, now: Instant) -> u64 {
        let Some(start) = self.interval_start else {
            return 0;
        };
        self.fold(start, now);
        self.interval_start = Some(now);
        self.drain_whole_seconds()
    }

    /// Pure read of the effective total: accumulated time plus the open
    /// interval's elapsed span. Safe to poll every second for the counter.
    pub fn current_total_ms(&self, now: Instant) -> u64 {
        match self.interval_start {
            Some(start) => self.accumulated_ms.saturating_add(Self::delta_ms(start, now)),
            None => self.accumulated_ms,
        }
    }

    fn fold(&mut self, start: Instant, now: Instant) {
        let delta_ms = Self::delta_ms(start, now);
        self.accumulated_ms = self.accumulated_ms.saturating_add(delta_ms);
        self.unflushed_ms = self.unflushed_ms.saturating_add(delta_ms);
    }

    fn drain_whole_seconds(&mut self) -> u64 {
        let seconds = self.unflushed_ms / 1000;
        self.unflushed_ms %= 1000;
        seconds
    }

    fn delta_ms(start: Instant, now: Instant) -> u64 {
        match now.checked_duration_since(start) {
            Some(elapsed) => elapsed.as_millis() as u64,
            None => {
                warn!("clock went backward across an open interval; counting it as empty");
                0
            }
        }
    }
}
