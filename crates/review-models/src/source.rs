use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream review sources, in the order the variants know them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,     // Paginated RSS/JSON customer review feed
    Scrape,   // HTML review listing page
    Internal, // Store-internal POST endpoint
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Scrape => "scrape",
            SourceKind::Internal => "internal",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source '{}' (expected feed, scrape or internal)", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feed" | "api" | "rss" => Ok(SourceKind::Feed),
            "scrape" | "html" => Ok(SourceKind::Scrape),
            "internal" | "post" => Ok(SourceKind::Internal),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}
