//! Settings Blob
//!
//! Theme, language, notification and display preferences kept as one JSON
//! document in `localStorage` under `app_settings`. Read once at start-up,
//! written back whole on every change. Missing or unreadable content means
//! defaults.

use serde::{Deserialize, Serialize};

use super::i18n::Lang;

pub const SETTINGS_KEY: &str = "app_settings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
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

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Lang,
    pub notifications: NotificationSettings,
    pub display: DisplaySettings,
}

/// Parse a stored blob, falling back to defaults
pub fn parse_settings(raw: Option<&str>) -> Preferences {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Read the blob from `localStorage`
pub fn load_settings() -> Preferences {
    let raw = local_storage().and_then(|s| s.get_item(SETTINGS_KEY).ok().flatten());
    parse_settings(raw.as_deref())
}

/// Overwrite the blob in `localStorage`
pub fn save_settings(prefs: &Preferences) -> Result<(), String> {
    let storage = local_storage().ok_or("localStorage unavailable")?;
    let json = serde_json::to_string(prefs).map_err(|e| e.to_string())?;
    storage
        .set_item(SETTINGS_KEY, &json)
        .map_err(|e| format!("{:?}", e))
}

/// Toggle the `dark` class on the document root
pub fn apply_theme(theme: Theme) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };

    let dark = match theme {
        Theme::Dark => true,
        Theme::Light => false,
        Theme::Auto => web_sys::window()
            .and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
            .map(|m| m.matches())
            .unwrap_or(false),
    };

    let classes = root.class_list();
    let _ = if dark {
        classes.add_1("dark")
    } else {
        classes.remove_1("dark")
    };
}
