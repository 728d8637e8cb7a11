#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Favicon provider selected per record. Only meaningful when the record has a URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaviconProvider {
    #[default]
    #[serde(rename = "chrome")]
    Chrome,
    #[serde(rename = "duck")]
    DuckDuckGo,
    #[serde(rename = "gen")]
    Generic,
    #[serde(rename = "none")]
    None,
}

impl FaviconProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::DuckDuckGo => "duck",
            Self::Generic => "gen",
            Self::None => "none",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "chrome" => Some(Self::Chrome),
            "duck" | "duckduckgo" => Some(Self::DuckDuckGo),
            "gen" | "generic" => Some(Self::Generic),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Icon decoration flag, persisted as `0` or `1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IconBorder {
    Hidden,
    #[default]
    Shown,
}

impl IconBorder {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Hidden => 0,
            Self::Shown => 1,
        }
    }
}

impl Serialize for IconBorder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for IconBorder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Hidden),
            1 => Ok(Self::Shown),
            other => Err(serde::de::Error::custom(format!(
                "border must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// The persisted unit: one link or folder, optionally naming its parent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<FaviconProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<IconBorder>,
}

impl FlatRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_icon(mut self, icon: FaviconProvider) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.task_complete.unwrap_or(false)
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }

    pub fn url_str(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// Effective provider for a linked record; `None` for folders.
    pub fn icon_provider(&self) -> Option<FaviconProvider> {
        self.url_str()?;
        Some(self.icon.unwrap_or_default())
    }

    /// Strips surrounding whitespace from the text fields; a blank url or parent
    /// counts as not set.
    pub fn trim_fields(&mut self) {
        let name = self.name.trim();
        if name.len() != self.name.len() {
            self.name = name.to_string();
        }
        self.url = trimmed(self.url.take());
        self.parent = trimmed(self.parent.take());
    }

    /// Normalizes optional fields the way records are expected to look after load:
    /// linked records get a border and a provider, folders lose both, and a cleared
    /// completion flag is stored as absent.
    pub fn apply_defaults(&mut self) {
        if self.url.as_deref().is_some_and(str::is_empty) {
            self.url = None;
        }
        if self.parent.as_deref().is_some_and(str::is_empty) {
            self.parent = None;
        }
        if self.url.is_some() {
            self.border.get_or_insert(IconBorder::Shown);
            self.icon.get_or_insert(FaviconProvider::Chrome);
        } else {
            self.border = None;
            self.icon = None;
        }
        if self.task_complete != Some(true) {
            self.task_complete = None;
        }
    }
}

fn trimmed(field: Option<String>) -> Option<String> {
    let value = field?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

pub fn apply_defaults_all(records: &mut [FlatRecord]) {
    for record in records {
        record.apply_defaults();
    }
}
