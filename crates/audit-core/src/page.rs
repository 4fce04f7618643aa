//! Discovered pages and the URL normalization shared with deduplication

use serde::{Deserialize, Serialize};
use url::Url;

/// Coarse classification of a discovered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Homepage,
    Form,
    Contact,
    Content,
    Other,
}

/// Scan priority class assigned during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagePriority {
    High,
    Medium,
    Low,
}

impl PagePriority {
    /// Priority for a page found at the given crawl depth
    pub fn for_depth(depth: u32) -> Self {
        match depth {
            0 => PagePriority::High,
            1 => PagePriority::Medium,
            _ => PagePriority::Low,
        }
    }
}

/// A page selected for scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Normalized absolute URL
    pub url: String,
    /// Link depth from the seed page
    pub depth: u32,
    /// Page classification from URL and title heuristics
    pub page_type: PageType,
    /// Scan priority class
    pub priority: PagePriority,
    /// Estimated element count from discovery, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_elements: Option<u32>,
}

impl PageRef {
    /// Build a seed page ref (depth 0, homepage, high priority)
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            page_type: PageType::Homepage,
            priority: PagePriority::High,
            estimated_elements: None,
        }
    }
}

/// Normalize a URL for deduplication and same-host comparison.
///
/// Rules: lowercase scheme and host, drop the fragment and any default
/// port, collapse consecutive slashes in the path, strip the trailing
/// slash (the root path stays "/"). The query string is preserved as-is.
pub fn normalize_url(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);

    let path = u.path();
    let mut normalized_path = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        normalized_path.push(ch);
    }
    if normalized_path.len() > 1 && normalized_path.ends_with('/') {
        normalized_path.pop();
    }
    if normalized_path.is_empty() {
        normalized_path.push('/');
    }
    u.set_path(&normalized_path);

    // The url crate already lowercases scheme and host and omits default
    // ports when serializing.
    u.to_string()
}

/// Parse and normalize a URL string in one step
pub fn parse_and_normalize(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(|u| normalize_url(&u))
}
