/// Source-specific record as it comes off the wire. Consumed by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReviewEntry {
    Feed(FeedEntry),
    Scraped(ScrapedEntry),
    Internal(InternalEntry),
}

/// Feed entry with every `{ "label": ... }` value flattened to its string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub author: Option<String>,
    pub rating: Option<String>, // im:rating
    pub title: Option<String>,
    pub content: Option<String>,
    pub version: Option<String>, // im:version
    pub updated: Option<String>,
    pub vote_count: Option<String>, // im:voteCount
    pub link: Option<String>,
    pub page_url: String,
}

/// Fields pulled out of one HTML review container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedEntry {
    pub review_id: Option<String>,
    pub user_name: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<u8>,
    pub rating_label: Option<String>, // aria-label of the star widget, e.g. "4 out of 5"
    pub version: Option<String>,
    pub date: Option<String>,
    pub helpful_count: Option<u32>,
    pub page_url: String,
}

/// Positional record decoded from the internal POST endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalEntry {
    pub review_id: Option<String>,
    pub user_name: Option<String>,
    pub rating: Option<u8>,
    pub text: Option<String>,
    pub date: Option<String>,
    pub date_epoch: Option<i64>,
    pub endpoint_url: String,
}
