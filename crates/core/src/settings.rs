#![forbid(unsafe_code)]

use crate::record::FaviconProvider;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// User preferences stored under their own key. Every field falls back to its
/// default, so a partial or older stored object never fails to load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Last provider the user picked in the edit form.
    pub default_favicon_provider: FaviconProvider,
    pub enable_right_click_complete: bool,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_favicon_provider: FaviconProvider::Chrome,
            enable_right_click_complete: true,
            theme: Theme::System,
        }
    }
}

impl Settings {
    /// Lenient decode, one field at a time: an unreadable field keeps its default
    /// without discarding the others, and a value that is not an object yields the
    /// defaults.
    pub fn from_stored(value: Option<Value>) -> Self {
        let mut settings = Self::default();
        let Some(value) = value else {
            return settings;
        };
        let Value::Object(fields) = value else {
            tracing::warn!("stored settings are not an object, using defaults");
            return settings;
        };
        read_field(&fields, "defaultFaviconProvider", &mut settings.default_favicon_provider);
        read_field(&fields, "enableRightClickComplete", &mut settings.enable_right_click_complete);
        read_field(&fields, "theme", &mut settings.theme);
        settings
    }
}

fn read_field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str, slot: &mut T) {
    let Some(raw) = fields.get(name) else {
        return;
    };
    match T::deserialize(raw) {
        Ok(value) => *slot = value,
        Err(err) => tracing::warn!(field = name, error = %err, "stored setting unreadable, keeping default"),
    }
}
