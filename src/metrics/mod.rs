mod types;

pub use types::{DailyUsage, HistorySnapshot, UsageLevel};

use anyhow::Result;

use crate::store::UsageStore;

/// Read the store back into the shape the calendar/chart renders from:
/// one record per recorded day, oldest first, plus the all-time total.
pub async fn load_history(store: &dyn UsageStore) -> Result<HistorySnapshot> {
    let totals = store.read_daily_totals().await?;

    let mut days: Vec<DailyUsage> = totals
        .into_iter()
        .map(|(date, seconds)| DailyUsage {
            date,
            seconds,
            level: UsageLevel::for_seconds(seconds),
        })
        .collect();
    days.sort_by_key(|day| day.date);

    let total_seconds = days.iter().map(|day| day.seconds).sum();

    Ok(HistorySnapshot {
        days,
        total_seconds,
    })
}

/// Render a millisecond total the way the live counter shows it:
/// `HH:MM:SS`, zero-padded, hours unbounded.
pub fn format_hms(total_ms: u64) -> String {
    let total_seconds = total_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::store::InMemoryStore;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn history_is_chronological_with_levels() {
        let store = InMemoryStore::new();
        store.append_usage(date("2026-03-15"), 500).await.unwrap();
        store.append_usage(date("2026-03-13"), 8000).await.unwrap();
        store.append_usage(date("2026-03-14"), 4000).await.unwrap();

        let history = load_history(&store).await.unwrap();

        let dates: Vec<_> = history.days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![date("2026-03-13"), date("2026-03-14"), date("2026-03-15")]
        );
        let levels: Vec<_> = history.days.iter().map(|d| d.level).collect();
        assert_eq!(
            levels,
            vec![UsageLevel::Heavy, UsageLevel::Moderate, UsageLevel::Light]
        );
        assert_eq!(history.total_seconds, 12_500);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_history() {
        let store = InMemoryStore::new();
        let history = load_history(&store).await.unwrap();
        assert!(history.days.is_empty());
        assert_eq!(history.total_seconds, 0);
    }

    #[test]
    fn counter_formatting_is_zero_padded() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(1_499), "00:00:01");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_661_000), "01:01:01");
        assert_eq!(format_hms(360_000_000), "100:00:00");
    }

    #[test]
    fn level_thresholds_match_the_calendar() {
        assert_eq!(UsageLevel::for_seconds(1), UsageLevel::Light);
        assert_eq!(UsageLevel::for_seconds(3600), UsageLevel::Light);
        assert_eq!(UsageLevel::for_seconds(3601), UsageLevel::Moderate);
        assert_eq!(UsageLevel::for_seconds(7200), UsageLevel::Moderate);
        assert_eq!(UsageLevel::for_seconds(7201), UsageLevel::Heavy);
    }
}
