//! Usage-time tracking engine: measures how long a user actively engages
//! with a page, survives focus changes and reloads, persists per-day
//! totals, and feeds the live counter and history views.
//!
//! The host wires browser-ish events into [`UsageTracker`]
//! (`on_visibility_change`, the pause/resume toggle, teardown) and
//! subscribes to snapshots for the counter; persistence goes through the
//! [`UsageStore`] trait, with a SQLite implementation included.

pub mod clock;
pub mod db;
pub mod error;
pub mod metrics;
pub mod settings;
pub mod store;
pub mod tracker;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use clock::{Clock, SystemClock};
pub use db::Database;
pub use error::{TrackerError, TrackerResult};
pub use metrics::{load_history, DailyUsage, HistorySnapshot, UsageLevel};
pub use settings::SettingsStore;
pub use store::{BufferedStore, InMemoryStore, SqliteUsageStore, UsageStore};
pub use tracker::{Session, TrackerSnapshot, TrackingStatus, UsageTracker};

/// Wire up the production stack under `data_dir` and start tracking:
/// SQLite-backed store behind the retry buffer, JSON settings, system
/// clock.
pub async fn bootstrap(data_dir: &Path) -> Result<UsageTracker> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("lernzeit.sqlite3"))?;
    let store: Arc<dyn UsageStore> =
        Arc::new(BufferedStore::new(Arc::new(SqliteUsageStore::new(database))));
    let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);

    let tracker = UsageTracker::new(store, settings);
    tracker.start().await;

    Ok(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_starts_a_live_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = bootstrap(dir.path()).await.unwrap();

        let snap = tracker.snapshot().await;
        assert_eq!(snap.status, TrackingStatus::Active);
        assert!(snap.tracking_enabled);
        assert!(snap.page_active);

        tracker.on_teardown().await;
        assert_ne!(tracker.snapshot().await.status, TrackingStatus::Active);
    }
}
