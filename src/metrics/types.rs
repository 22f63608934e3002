use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar color-coding bucket for a recorded day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UsageLevel {
    Light,
    Moderate,
    Heavy,
}

impl UsageLevel {
    pub fn for_seconds(seconds: u64) -> Self {
        if seconds > 7200 {
            UsageLevel::Heavy
        } else if seconds > 3600 {
            UsageLevel::Moderate
        } else {
            UsageLevel::Light
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub seconds: u64,
    pub level: UsageLevel,
}

/// Everything the calendar/chart view consumes, days in chronological
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub days: Vec<DailyUsage>,
    pub total_seconds: u64,
}
