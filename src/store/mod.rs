use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod buffered;
pub mod memory;
pub mod sqlite;

pub use buffered::BufferedStore;
pub use memory::InMemoryStore;
pub use sqlite::SqliteUsageStore;

/// Durable store for per-day usage totals.
///
/// Implementations sum on write: the engine flushes several deltas per
/// lifetime (periodic checkpoints plus the final close) and they must not
/// overwrite each other. For the same reason, two engine instances
/// flushing the same date double-count additively; there is no
/// cross-process coordination.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Full mapping of recorded dates to cumulative seconds. Read once at
    /// load to seed today's counter, and by the history view.
    async fn read_daily_totals(&self) -> Result<HashMap<NaiveDate, u64>>;

    /// Add `seconds` to the total recorded for `date`.
    async fn append_usage(&self, date: NaiveDate, seconds: u64) -> Result<()>;
}
