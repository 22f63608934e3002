use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Durable user preferences, kept in a JSON file beside the database.
///
/// Only the track-when-inactive flag lives here. The tracking on/off
/// toggle is deliberately session-scoped: it resets with every engine
/// lifetime and is held in tracker state instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    track_when_inactive: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            track_when_inactive: false,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn track_when_inactive(&self) -> bool {
        self.data.read().unwrap().track_when_inactive
    }

    pub fn set_track_when_inactive(&self, enabled: bool) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.track_when_inactive = enabled;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(!store.track_when_inactive());
        store.set_track_when_inactive(true).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert!(reloaded.track_when_inactive());
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert!(!store.track_when_inactive());
    }
}
