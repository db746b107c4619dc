//! Paginated customer-review feed (RSS rendered as JSON).
//!
//! Every value in the feed is wrapped as `{ "label": ... }`. The first entry
//! of page 1 describes the app itself and is not a review.

use crate::error::{BlockedError, HttpError, MalformedEntryError};
use crate::http::{accept_language, HttpRequest, ReviewHttpClient};
use crate::traits::{EventLevel, FetchRequest, Harvest, ReviewFetcher, RunSink, StopReason};
use async_trait::async_trait;
use review_config::FeedConfig;
use review_models::{FeedEntry, RawReviewEntry, SourceKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct FeedFetcher {
    client: Arc<ReviewHttpClient>,
    config: FeedConfig,
}

impl FeedFetcher {
    pub fn new(client: Arc<ReviewHttpClient>, config: FeedConfig) -> Self {
        Self { client, config }
    }

    pub fn page_url(&self, request: &FetchRequest, page: u32) -> String {
        format!(
            "{}/{}/rss/customerreviews/page={}/id={}/sortby={}/json",
            self.config.base_url.trim_end_matches('/'),
            request.country,
            page,
            request.app_id,
            self.config.sort
        )
    }
}

#[async_trait]
impl ReviewFetcher for FeedFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    async fn fetch(&self, request: &FetchRequest, sink: &dyn RunSink) -> Result<Harvest, BlockedError> {
        let mut harvest = Harvest::default();
        let mut seen: HashSet<String> = HashSet::new();
        let target = request.target_count;

        info!(app_id = %request.app_id, target = target, "Fetching reviews from feed");

        let mut page = 1;
        loop {
            if harvest.len() >= target {
                harvest.stop = StopReason::TargetReached;
                break;
            }
            if page > self.config.max_pages {
                harvest.stop = StopReason::PageLimit;
                break;
            }

            let url = self.page_url(request, page);
            let http_request = HttpRequest::get(&url)
                .header("Accept-Language", accept_language(&request.country));
            let response = match self.client.send(&http_request).await {
                Ok(response) => response,
                Err(HttpError::Blocked(reason)) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Feed),
                        &format!("Block detected on feed page {}: {}", page, reason),
                    );
                    return Err(BlockedError {
                        source_kind: SourceKind::Feed,
                        reason,
                        partial: harvest,
                    });
                }
                Err(e) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Feed),
                        &format!("Feed page {} failed, stopping feed: {}", page, e),
                    );
                    harvest.stop = StopReason::Failed;
                    break;
                }
            };

            let document: Value = match response.json() {
                Ok(document) => document,
                Err(e) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Feed),
                        &format!("Feed page {} is not valid JSON, stopping feed: {}", page, e),
                    );
                    harvest.stop = StopReason::Failed;
                    break;
                }
            };

            let mut entries = feed_entries(&document);
            if page == 1 && !entries.is_empty() {
                let header = entries.remove(0);
                harvest.app_name = label(header, "im:name");
            }

            let mut added = 0;
            let mut repeated = 0;
            for value in entries {
                if harvest.len() >= target {
                    break;
                }
                match decode_entry(value, &url) {
                    Ok(Some(entry)) => {
                        if seen.insert(entry_key(&entry)) {
                            harvest.entries.push(RawReviewEntry::Feed(entry));
                            added += 1;
                        } else {
                            repeated += 1;
                        }
                    }
                    Ok(None) => harvest.skipped += 1,
                    Err(e) => {
                        sink.record(EventLevel::Warn, Some(SourceKind::Feed), &e.to_string());
                        harvest.skipped += 1;
                    }
                }
            }

            harvest.pages_fetched += 1;
            sink.progress(SourceKind::Feed, harvest.len(), target);
            debug!(
                page = page,
                added = added,
                repeated = repeated,
                total = harvest.len(),
                "Feed page processed"
            );

            // A page that only repeats earlier entries means the feed is exhausted
            if added == 0 {
                harvest.stop = StopReason::Exhausted;
                break;
            }
            page += 1;
        }

        info!(
            collected = harvest.len(),
            skipped = harvest.skipped,
            pages = harvest.pages_fetched,
            stop = ?harvest.stop,
            "Feed fetch finished"
        );
        Ok(harvest)
    }
}

/// `feed.entry` is an array, or a bare object when the page holds one entry
fn feed_entries(document: &Value) -> Vec<&Value> {
    match document.pointer("/feed/entry") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn label(value: &Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    let text = match field.get("label").unwrap_or(field) {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn link_href(value: &Value) -> Option<String> {
    let link = value.get("link")?;
    let link = match link {
        Value::Array(items) => items.first()?,
        other => other,
    };
    link.pointer("/attributes/href")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Identity of an entry within one fetch: its id, or author, date and body
fn entry_key(entry: &FeedEntry) -> String {
    match &entry.id {
        Some(id) => format!("id:{}", id),
        None => format!(
            "{}|{}|{}",
            entry.author.as_deref().unwrap_or_default(),
            entry.updated.as_deref().unwrap_or_default(),
            entry.content.as_deref().unwrap_or_default()
        ),
    }
}

/// `Ok(None)` for entries without a rating, which are not reviews
fn decode_entry(value: &Value, page_url: &str) -> Result<Option<FeedEntry>, MalformedEntryError> {
    if !value.is_object() {
        return Err(MalformedEntryError::new(
            SourceKind::Feed,
            format!("expected an object, found {}", value),
        ));
    }

    let rating = match label(value, "im:rating") {
        Some(rating) => rating,
        None => return Ok(None),
    };

    Ok(Some(FeedEntry {
        id: label(value, "id"),
        author: value.get("author").and_then(|author| label(author, "name")),
        rating: Some(rating),
        title: label(value, "title"),
        content: label(value, "content"),
        version: label(value, "im:version"),
        updated: label(value, "updated"),
        vote_count: label(value, "im:voteCount"),
        link: link_href(value),
        page_url: page_url.to_string(),
    }))
}
