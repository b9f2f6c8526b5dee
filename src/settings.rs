/// Popup preferences stored in chrome.storage.sync
use serde::{Deserialize, Serialize};

/// Storage key the settings live under
pub const SETTINGS_KEY: &str = "userSettings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Ask before closing tabs
    pub confirm_close: bool,
    /// Pre-check tabs 2..N of every group
    pub auto_select: bool,
    pub performance_mode: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            confirm_close: true,
            auto_select: true,
            performance_mode: false,
        }
    }
}

impl UserSettings {
    /// Stored settings over the defaults. Missing or malformed data gives defaults.
    pub fn from_stored(stored: Option<serde_json::Value>) -> Self {
        stored
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn loading_message(&self) -> &'static str {
        if self.performance_mode {
            "Analyzing tabs (Performance Mode)..."
        } else {
            "Analyzing tabs..."
        }
    }
}
