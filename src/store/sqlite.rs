use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::Database;

use super::UsageStore;

/// Usage store backed by the SQLite `daily_usage` table.
pub struct SqliteUsageStore {
    db: Database,
}

impl SqliteUsageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageStore for SqliteUsageStore {
    async fn read_daily_totals(&self) -> Result<HashMap<NaiveDate, u64>> {
        self.db.get_daily_totals().await
    }

    async fn append_usage(&self, date: NaiveDate, seconds: u64) -> Result<()> {
        self.db.add_daily_usage(date, seconds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flushed_deltas_add_up_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("usage.sqlite3")).unwrap();
        let store = SqliteUsageStore::new(db);
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        store.append_usage(date, 10).await.unwrap();
        let totals = store.read_daily_totals().await.unwrap();
        assert_eq!(totals.get(&date), Some(&10));

        store.append_usage(date, 10).await.unwrap();
        let totals = store.read_daily_totals().await.unwrap();
        assert_eq!(totals.get(&date), Some(&20));
    }
}
