//! Local Preferences
//!
//! The settings blob: one JSON document under one key, loaded once and
//! overwritten wholesale on every change. A missing or unreadable blob
//! yields defaults. There is no versioning.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Key the settings blob lives under
pub const SETTINGS_KEY: &str = "app_settings";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    Lock,
}

pub type PreferenceResult<T> = Result<T, PreferenceError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub attendance: bool,
    pub reports: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            attendance: true,
            reports: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub compact_mode: bool,
    pub show_avatar: bool,
    pub animations_enabled: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            compact_mode: false,
            show_avatar: true,
            animations_enabled: true,
        }
    }
}

/// The settings blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
    pub notifications: NotificationSettings,
    pub display: DisplaySettings,
}

/// String key-value persistence
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> PreferenceResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PreferenceResult<()>;
    fn remove(&self, key: &str) -> PreferenceResult<()>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> PreferenceResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| PreferenceError::Lock)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PreferenceResult<()> {
        let mut entries = self.entries.lock().map_err(|_| PreferenceError::Lock)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PreferenceResult<()> {
        let mut entries = self.entries.lock().map_err(|_| PreferenceError::Lock)?;
        entries.remove(key);
        Ok(())
    }
}

/// One `{key}.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.config/school-attendance` or the current directory
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .map(|d| d.join("school-attendance"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PreferenceResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PreferenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> PreferenceResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> PreferenceResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PreferenceResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read a JSON value; unparsable content reads as absent
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> PreferenceResult<Option<T>> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Ignoring unreadable stored value");
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> PreferenceResult<()> {
    storage.set(key, &serde_json::to_string_pretty(value)?)
}

/// Settings blob bound to a storage backend
pub struct PreferenceStore<S: KeyValueStorage> {
    storage: S,
    current: Preferences,
}

impl<S: KeyValueStorage> PreferenceStore<S> {
    /// Read the blob once; any failure falls back to defaults
    pub fn load(storage: S) -> Self {
        let current = match load_json::<Preferences>(&storage, SETTINGS_KEY) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read preferences, using defaults");
                Preferences::default()
            }
        };
        Self { storage, current }
    }

    pub fn get(&self) -> &Preferences {
        &self.current
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply `change` and write the whole blob back
    pub fn update<F>(&mut self, change: F) -> PreferenceResult<&Preferences>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut next = self.current.clone();
        change(&mut next);
        self.replace(next)
    }

    pub fn replace(&mut self, prefs: Preferences) -> PreferenceResult<&Preferences> {
        save_json(&self.storage, SETTINGS_KEY, &prefs)?;
        self.current = prefs;
        Ok(&self.current)
    }

    pub fn reset(&mut self) -> PreferenceResult<&Preferences> {
        self.replace(Preferences::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, Language::Vi);
        assert!(prefs.notifications.reports);
        assert!(!prefs.display.compact_mode);
        assert!(prefs.display.show_avatar);
    }

    #[test]
    fn test_partial_blob_fills_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"theme":"dark","display":{"compact_mode":true}}"#).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, Language::Vi);
        assert!(prefs.display.compact_mode);
        assert!(prefs.display.animations_enabled);
    }

    #[test]
    fn test_corrupt_blob_yields_defaults() {
        let storage = MemoryStorage::new();
        storage.set(SETTINGS_KEY, "{not json").unwrap();

        let store = PreferenceStore::load(storage);
        assert_eq!(store.get(), &Preferences::default());
    }

    #[test]
    fn test_update_writes_whole_blob() {
        let mut store = PreferenceStore::load(MemoryStorage::new());
        store.update(|p| p.language = Language::En).unwrap();
        store.update(|p| p.theme = Theme::Auto).unwrap();

        let raw = store.storage().get(SETTINGS_KEY).unwrap().unwrap();
        let saved: Preferences = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.language, Language::En);
        assert_eq!(saved.theme, Theme::Auto);
    }

    #[test]
    fn test_file_storage_persists() {
        let dir = tempdir().unwrap();

        let mut store = PreferenceStore::load(FileStorage::new(dir.path()));
        store.update(|p| p.notifications.push = false).unwrap();

        let reloaded = PreferenceStore::load(FileStorage::new(dir.path()));
        assert!(!reloaded.get().notifications.push);

        let storage = FileStorage::new(dir.path());
        storage.remove(SETTINGS_KEY).unwrap();
        storage.remove(SETTINGS_KEY).unwrap();
        assert!(storage.get(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(PreferenceError::InvalidKey(_))
        ));
    }
}
