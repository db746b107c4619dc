use serde::{Deserialize, Serialize};

/// One normalized review. Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CanonicalReview {
    pub review_id: Option<String>, // Missing on many scraped entries
    pub app_id: String,
    pub app_name: String,
    pub country: String,
    pub user_name: String,
    pub rating: Option<u8>, // 1-5, None when the source value did not parse
    pub title: String,
    pub text: String,
    pub version: String,
    pub date: Option<String>, // ISO-8601
    pub helpful_count: Option<u32>,
    pub raw_source_url: Option<String>,
}

impl CanonicalReview {
    pub const COLUMNS: [&'static str; 12] = [
        "review_id",
        "app_id",
        "app_name",
        "country",
        "user_name",
        "rating",
        "title",
        "text",
        "version",
        "date",
        "helpful_count",
        "raw_source_url",
    ];

    /// First `len` characters of the body, used by the fallback dedup identity.
    pub fn text_prefix(&self, len: usize) -> String {
        self.text.chars().take(len).collect()
    }
}
