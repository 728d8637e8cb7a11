#![forbid(unsafe_code)]

use clap::ValueEnum;
use lt_core::{FaviconProvider, FlatRecord};
use serde::Serialize;

/// Host-side permission state, queried whenever the footer flags are re-derived.
pub trait PermissionProbe {
    fn favicon_granted(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PermissionState {
    #[default]
    Granted,
    Denied,
}

impl PermissionProbe for PermissionState {
    fn favicon_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FooterMessage {
    #[serde(rename = "request-favicon-permission")]
    RequestFaviconPermission,
}

impl FooterMessage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestFaviconPermission => "request-favicon-permission",
        }
    }
}

pub fn derive_footer(records: &[FlatRecord], permission: &impl PermissionProbe) -> Vec<FooterMessage> {
    let wants_favicon_cache = records
        .iter()
        .any(|r| r.icon_provider() == Some(FaviconProvider::Chrome));
    if wants_favicon_cache && !permission.favicon_granted() {
        vec![FooterMessage::RequestFaviconPermission]
    } else {
        Vec::new()
    }
}
