//! Store-internal review endpoint, queried by POST with page number and sort
//! order. The response is a JSON array document behind an anti-JSON guard;
//! reviews are positional arrays whose layout comes from configuration.

use crate::error::{BlockedError, HttpError, MalformedEntryError};
use crate::http::{accept_language, HttpRequest, ReviewHttpClient};
use crate::traits::{EventLevel, FetchRequest, Harvest, ReviewFetcher, RunSink, StopReason};
use async_trait::async_trait;
use review_config::{InternalConfig, PositionalFields};
use review_models::{InternalEntry, RawReviewEntry, SourceKind};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct InternalFetcher {
    client: Arc<ReviewHttpClient>,
    config: InternalConfig,
}

impl InternalFetcher {
    pub fn new(client: Arc<ReviewHttpClient>, config: InternalConfig) -> Self {
        Self { client, config }
    }

    fn form(&self, request: &FetchRequest, page: u32) -> Vec<(String, String)> {
        let mut form = vec![
            ("id".to_string(), request.app_id.clone()),
            ("gl".to_string(), request.country.clone()),
            (self.config.page_param.clone(), page.to_string()),
            (self.config.sort_param.clone(), self.config.sort.clone()),
        ];
        form.extend(self.config.extra_form.iter().map(|(k, v)| (k.clone(), v.clone())));
        form
    }

    /// Strip the guard prefix and walk `reviews_path` down to the review array
    pub fn review_items(&self, body: &str) -> Result<Vec<Value>, String> {
        let trimmed = body.trim_start();
        let payload = trimmed
            .strip_prefix(self.config.strip_prefix.as_str())
            .unwrap_or(trimmed);
        let document: Value = serde_json::from_str(payload).map_err(|e| format!("invalid JSON: {}", e))?;

        let mut node = &document;
        for (depth, index) in self.config.reviews_path.iter().enumerate() {
            node = match node.get(*index) {
                Some(child) => child,
                // A short document is the normal end-of-data shape
                None if depth > 0 => return Ok(Vec::new()),
                None => return Err(format!("review path index {} missing at depth {}", index, depth)),
            };
        }

        match node {
            Value::Array(items) => Ok(items.clone()),
            Value::Null => Ok(Vec::new()),
            other => Err(format!("expected review array, found {}", type_name(other))),
        }
    }
}

#[async_trait]
impl ReviewFetcher for InternalFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Internal
    }

    async fn fetch(&self, request: &FetchRequest, sink: &dyn RunSink) -> Result<Harvest, BlockedError> {
        let mut harvest = Harvest::default();
        let target = request.target_count;

        info!(app_id = %request.app_id, target = target, url = %self.config.url, "Fetching reviews from internal endpoint");

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

            let http_request = HttpRequest::post_form(&self.config.url, self.form(request, page))
                .header("Accept-Language", accept_language(&request.country))
                .expect_json();
            let response = match self.client.send(&http_request).await {
                Ok(response) => response,
                Err(HttpError::Blocked(reason)) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Internal),
                        &format!("Block detected on internal page {}: {}", page, reason),
                    );
                    return Err(BlockedError {
                        source_kind: SourceKind::Internal,
                        reason,
                        partial: harvest,
                    });
                }
                Err(e) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Internal),
                        &format!("Internal page {} failed, stopping: {}", page, e),
                    );
                    harvest.stop = StopReason::Failed;
                    break;
                }
            };

            let items = match self.review_items(&response.body) {
                Ok(items) => items,
                Err(message) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Internal),
                        &format!("Internal page {} unreadable, stopping: {}", page, message),
                    );
                    harvest.stop = StopReason::Failed;
                    break;
                }
            };
            harvest.pages_fetched += 1;

            if items.is_empty() {
                harvest.stop = StopReason::Exhausted;
                break;
            }

            for item in &items {
                if harvest.len() >= target {
                    break;
                }
                match decode_positional(item, &self.config.fields, &self.config.url) {
                    Ok(entry) => harvest.entries.push(RawReviewEntry::Internal(entry)),
                    Err(e) => {
                        sink.record(EventLevel::Warn, Some(SourceKind::Internal), &e.to_string());
                        harvest.skipped += 1;
                    }
                }
            }
            sink.progress(SourceKind::Internal, harvest.len(), target);
            debug!(page = page, items = items.len(), total = harvest.len(), "Internal page processed");

            page += 1;
        }

        info!(collected = harvest.len(), stop = ?harvest.stop, "Internal endpoint fetch finished");
        Ok(harvest)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A string, or the first string inside a nested array (`["name", [...]]`)
fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

fn rating_value(value: &Value) -> Option<u8> {
    let stars = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let stars = stars.round();
    if (1.0..=5.0).contains(&stars) {
        Some(stars as u8)
    } else {
        None
    }
}

/// Epoch seconds as a number or a `[seconds, nanos]` pair
fn epoch_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(items) => items.first().and_then(Value::as_i64),
        _ => None,
    }
}

fn decode_positional(item: &Value, fields: &PositionalFields, endpoint_url: &str) -> Result<InternalEntry, MalformedEntryError> {
    let cells = item.as_array().ok_or_else(|| {
        MalformedEntryError::new(SourceKind::Internal, format!("expected a positional array, found {}", type_name(item)))
    })?;
    let cell = |index: usize| cells.get(index).filter(|v| !v.is_null());

    let date_cell = cell(fields.date);
    let entry = InternalEntry {
        review_id: fields.id.and_then(cell).and_then(first_string),
        user_name: cell(fields.user).and_then(first_string),
        rating: cell(fields.rating).and_then(rating_value),
        text: cell(fields.text).and_then(first_string),
        date: date_cell.and_then(Value::as_str).map(|s| s.trim().to_string()),
        date_epoch: date_cell.and_then(epoch_value),
        endpoint_url: endpoint_url.to_string(),
    };

    if entry.review_id.is_none() && entry.user_name.is_none() && entry.text.is_none() {
        return Err(MalformedEntryError::new(
            SourceKind::Internal,
            "positional record has no id, user or text".to_string(),
        ));
    }

    Ok(entry)
}
