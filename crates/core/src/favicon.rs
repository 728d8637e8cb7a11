#![forbid(unsafe_code)]

use crate::record::{FaviconProvider, FlatRecord};
use url::Url;

pub const FALLBACK_ICON_PATH: &str = "misc/favicon.ico";

/// Icon URL for `page_url` under `provider`. `extension_base` is the origin that
/// serves the browser's built-in favicon cache. Returns `None` for `FaviconProvider::None`.
pub fn icon_url(provider: FaviconProvider, page_url: &str, extension_base: &str) -> Option<String> {
    let parsed = match Url::parse(page_url) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(url = page_url, error = %err, "unparseable url for favicon");
            return match provider {
                FaviconProvider::None => None,
                _ => Some(FALLBACK_ICON_PATH.to_string()),
            };
        }
    };

    match provider {
        FaviconProvider::Chrome => Some(chrome_cache_url(page_url, extension_base)),
        FaviconProvider::DuckDuckGo => parsed
            .host_str()
            .map(|host| format!("https://icons.duckduckgo.com/ip2/{host}.ico")),
        FaviconProvider::Generic => Some(generic_url(&parsed)),
        FaviconProvider::None => None,
    }
}

pub fn record_icon_url(record: &FlatRecord, extension_base: &str) -> Option<String> {
    let url = record.url_str()?;
    icon_url(record.icon_provider()?, url, extension_base)
}

fn chrome_cache_url(page_url: &str, extension_base: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("pageUrl", page_url)
        .append_pair("size", "32")
        .finish();
    format!("{}/_favicon/?{query}", extension_base.trim_end_matches('/'))
}

fn generic_url(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    let (origin, path) = match url.host_str().unwrap_or_default() {
        "zoom.us" => (origin, "zoom.ico"),
        "calendar.google.com" => (origin, "googlecalendar/images/favicon_v2014_3.ico"),
        "www.figma.com" => (
            "https://static.figma.com".to_string(),
            "app/icon/1/icon-128.png",
        ),
        "www.atlassian.com" => (
            "https://wac-cdn.atlassian.com".to_string(),
            "assets/img/favicons/atlassian/favicon.png",
        ),
        "localhost" => (String::new(), FALLBACK_ICON_PATH),
        _ => (origin, "favicon.ico"),
    };
    format!("{origin}/{path}")
}
