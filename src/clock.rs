use std::time::Instant;

use chrono::NaiveDate;

/// Time source for the tracking engine.
///
/// Interval arithmetic runs on monotonic instants; the daily usage bucket
/// is keyed by the user's local calendar date. Both reads go through this
/// trait so tests can drive the engine with fabricated time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Local calendar date used as the daily usage bucket.
    fn today(&self) -> NaiveDate;
}

/// System-backed clock; replaced by a fixed clock in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
