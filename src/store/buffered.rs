use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;
use tokio::sync::Mutex;

use super::UsageStore;

/// Retry wrapper around a usage store.
///
/// A failed append parks its delta in an in-memory pending map that is
/// merged into the next attempt, so seconds already subtracted from the
/// engine's unflushed bucket are not silently dropped while the backend
/// is unreachable. Deltas still pending when the process exits are lost;
/// that window is the accepted cost of not writing a local journal.
pub struct BufferedStore {
    inner: Arc<dyn UsageStore>,
    pending: Mutex<HashMap<NaiveDate, u64>>,
}

impl BufferedStore {
    pub fn new(inner: Arc<dyn UsageStore>) -> Self {
        Self {
            inner,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Seconds parked by failed appends, for a soft status indicator.
    pub async fn pending_seconds(&self) -> u64 {
        self.pending.lock().await.values().sum()
    }
}

#[async_trait]
impl UsageStore for BufferedStore {
    async fn read_daily_totals(&self) -> Result<HashMap<NaiveDate, u64>> {
        self.inner.read_daily_totals().await
    }

    async fn append_usage(&self, date: NaiveDate, seconds: u64) -> Result<()> {
        let batch = {
            let mut pending = self.pending.lock().await;
            let entry = pending.entry(date).or_insert(0);
            *entry = entry.saturating_add(seconds);
            std::mem::take(&mut *pending)
        };

        let mut first_err = None;
        for (date, seconds) in batch {
            if let Err(err) = self.inner.append_usage(date, seconds).await {
                warn!("parking {seconds}s for {date} until the store recovers");
                let mut pending = self.pending.lock().await;
                let entry = pending.entry(date).or_insert(0);
                *entry = entry.saturating_add(seconds);
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
