use std::path::Path;
use tokio::sync::RwLock;

use super::{PreferenceError, Preferences, PreferencesUpdate, StoredPreferences, Theme};
use crate::units::Units;

/// Most recent first, deduplicated
const MAX_RECENT_SEARCHES: usize = 5;

/// Flat JSON file holding client preferences.
///
/// Read once at startup; every change is written straight back.
pub struct PreferenceStore {
    stored: RwLock<StoredPreferences>,
    file_path: String,
    default_units: Units,
}

impl PreferenceStore {
    pub fn new(file_path: impl Into<String>, default_units: Units) -> Self {
        Self {
            stored: RwLock::new(StoredPreferences::default()),
            file_path: file_path.into(),
            default_units,
        }
    }

    /// Load preferences from file
    pub async fn load(&self) -> Result<(), PreferenceError> {
        let path = Path::new(&self.file_path);

        if !path.exists() {
            tracing::debug!(path = %self.file_path, "Preference file does not exist, using defaults");
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let stored: StoredPreferences = serde_json::from_str(&content)?;

        let mut current = self.stored.write().await;
        *current = stored;

        tracing::info!(
            theme = ?current.theme,
            units = ?current.units,
            recent = current.recent_searches.len(),
            "Loaded preferences"
        );

        Ok(())
    }

    async fn save(&self, stored: &StoredPreferences) -> Result<(), PreferenceError> {
        let content = serde_json::to_string_pretty(stored)?;

        // Create parent directory if needed
        if let Some(parent) = Path::new(&self.file_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.file_path, content).await?;

        tracing::debug!(path = %self.file_path, "Saved preferences");

        Ok(())
    }

    /// Stored values with defaults filled in
    pub async fn get(&self) -> Preferences {
        let stored = self.stored.read().await;
        self.resolve(&stored)
    }

    pub async fn units(&self) -> Units {
        self.stored.read().await.units.unwrap_or(self.default_units)
    }

    pub async fn update(&self, update: PreferencesUpdate) -> Result<Preferences, PreferenceError> {
        self.commit(|next| {
            if let Some(theme) = update.theme {
                next.theme = Some(theme);
            }
            if let Some(units) = update.units {
                next.units = Some(units);
            }
        })
        .await
    }

    /// Remember a selected location label
    pub async fn add_recent_search(&self, label: &str) -> Result<(), PreferenceError> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(());
        }

        self.commit(|next| {
            next.recent_searches
                .retain(|existing| !existing.eq_ignore_ascii_case(label));
            next.recent_searches.insert(0, label.to_string());
            next.recent_searches.truncate(MAX_RECENT_SEARCHES);
        })
        .await
        .map(|_| ())
    }

    pub async fn clear_recent_searches(&self) -> Result<(), PreferenceError> {
        self.commit(|next| next.recent_searches.clear())
            .await
            .map(|_| ())
    }

    /// Apply `change` to a copy, write it, and only then make it current
    async fn commit<F>(&self, change: F) -> Result<Preferences, PreferenceError>
    where
        F: FnOnce(&mut StoredPreferences),
    {
        let mut stored = self.stored.write().await;
        let mut next = stored.clone();
        change(&mut next);
        self.save(&next).await?;
        *stored = next;
        Ok(self.resolve(&stored))
    }

    fn resolve(&self, stored: &StoredPreferences) -> Preferences {
        Preferences {
            theme: stored.theme.unwrap_or_else(Theme::system_default),
            units: stored.units.unwrap_or(self.default_units),
            recent_searches: stored.recent_searches.clone(),
        }
    }
}
