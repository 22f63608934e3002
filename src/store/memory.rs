use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::UsageStore;

/// Usage store held entirely in memory, for hosts without a database.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    totals: Mutex<HashMap<NaiveDate, u64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryStore {
    async fn read_daily_totals(&self) -> Result<HashMap<NaiveDate, u64>> {
        Ok(self.totals.lock().await.clone())
    }

    async fn append_usage(&self, date: NaiveDate, seconds: u64) -> Result<()> {
        let mut totals = self.totals.lock().await;
        let entry = totals.entry(date).or_insert(0);
        *entry = entry.saturating_add(seconds);
        Ok(())
    }
}
