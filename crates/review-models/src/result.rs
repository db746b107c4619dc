use crate::review::CanonicalReview;
use crate::source::SourceKind;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub reviews_collected: usize,
    pub fetched: BTreeMap<SourceKind, usize>, // Raw entries per source before normalization
    pub duplicates_dropped: usize,
    pub malformed_dropped: usize,
    pub truncated: usize,
}

/// Output of one collection run. Feed entries come before fallback entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionResult {
    pub app_id: String,
    pub app_name: String,
    pub country: String,
    pub target_count: usize,
    pub reviews: Vec<CanonicalReview>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    pub counts: CollectionCounts,
}

impl CollectionResult {
    pub fn reviews_collected(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
