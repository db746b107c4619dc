use crate::error::{BlockedError, HttpError, MalformedEntryError};
use crate::http::{accept_language, HttpRequest, ReviewHttpClient};
use crate::traits::{EventLevel, FetchRequest, Harvest, ReviewFetcher, RunSink, StopReason};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use review_config::ScrapeConfig;
use review_models::{RawReviewEntry, ScrapedEntry, SourceKind};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Structural markers of the review listing page. Several candidates per
/// field, tried in order.
struct ReviewSelectors {
    app_title: Selector,
    container: Selector,
    user_name: Vec<Selector>,
    title: Vec<Selector>,
    body: Vec<Selector>,
    star_rating: Selector,
    version: Selector,
    date: Selector,
    helpful: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

impl ReviewSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            app_title: selector("h1.app-header__title")?,
            container: selector("div.we-customer-review")?,
            user_name: vec![
                selector(".we-customer-review__user")?,
                selector("span.we-truncate--single-line")?,
            ],
            title: vec![selector(".we-customer-review__title")?, selector("h3")?],
            body: vec![selector(".we-customer-review__body")?, selector("blockquote")?],
            star_rating: selector(".we-star-rating[aria-label]")?,
            version: selector(".we-customer-review__version")?,
            date: selector("time")?,
            helpful: selector(".we-customer-review__helpful-count")?,
        })
    }
}

/// Result of parsing one listing page
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub app_name: Option<String>,
    pub containers: usize,
    pub entries: Vec<ScrapedEntry>,
    pub failures: Vec<MalformedEntryError>,
}

pub struct ScrapeFetcher {
    client: Arc<ReviewHttpClient>,
    config: ScrapeConfig,
    selectors: ReviewSelectors,
}

impl ScrapeFetcher {
    pub fn new(client: Arc<ReviewHttpClient>, config: ScrapeConfig) -> Result<Self> {
        Ok(Self {
            client,
            config,
            selectors: ReviewSelectors::new()?,
        })
    }

    pub fn listing_url(&self, request: &FetchRequest) -> String {
        format!(
            "{}/{}/app/id{}",
            self.config.base_url.trim_end_matches('/'),
            request.country,
            request.app_id
        )
    }

    /// Parse one listing page. Holds the DOM only for the duration of the call.
    pub fn parse_page(&self, html: &str, page_url: &str) -> ParsedPage {
        let document = Html::parse_document(html);
        let mut parsed = ParsedPage {
            app_name: document
                .select(&self.selectors.app_title)
                .next()
                .map(element_text)
                .filter(|name| !name.is_empty()),
            ..ParsedPage::default()
        };

        for container in document.select(&self.selectors.container) {
            parsed.containers += 1;
            match self.extract(container, page_url) {
                Ok(entry) => parsed.entries.push(entry),
                Err(e) => parsed.failures.push(e),
            }
        }

        parsed
    }

    /// Each field is extracted independently; a missing node only empties that field.
    fn extract(&self, container: ElementRef<'_>, page_url: &str) -> Result<ScrapedEntry, MalformedEntryError> {
        let s = &self.selectors;

        let review_id = ["id", "data-review-id"]
            .iter()
            .find_map(|attr| container.value().attr(attr))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let rating_label = container
            .select(&s.star_rating)
            .next()
            .and_then(|star| star.value().attr("aria-label"))
            .map(|label| label.trim().to_string());

        let date = container.select(&s.date).next().and_then(|time| {
            time.value()
                .attr("datetime")
                .map(|d| d.trim().to_string())
                .or_else(|| Some(element_text(time)))
                .filter(|d| !d.is_empty())
        });

        let entry = ScrapedEntry {
            review_id,
            user_name: first_text(container, &s.user_name),
            title: first_text(container, &s.title),
            text: first_text(container, &s.body),
            rating: rating_label.as_deref().and_then(parse_star_label),
            rating_label,
            version: first_text(container, std::slice::from_ref(&s.version)),
            date,
            helpful_count: first_text(container, std::slice::from_ref(&s.helpful))
                .as_deref()
                .and_then(leading_number),
            page_url: page_url.to_string(),
        };

        if entry.review_id.is_none()
            && entry.user_name.is_none()
            && entry.title.is_none()
            && entry.text.is_none()
            && entry.rating_label.is_none()
        {
            return Err(MalformedEntryError::new(
                SourceKind::Scrape,
                format!("review container on {} has no recognizable fields", page_url),
            ));
        }

        Ok(entry)
    }
}

#[async_trait]
impl ReviewFetcher for ScrapeFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    async fn fetch(&self, request: &FetchRequest, sink: &dyn RunSink) -> Result<Harvest, BlockedError> {
        let mut harvest = Harvest::default();
        let mut seen: HashSet<String> = HashSet::new();
        let target = request.target_count;
        let url = self.listing_url(request);

        info!(app_id = %request.app_id, target = target, "Scraping review listing");

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

            let http_request = HttpRequest::get(&url)
                .query("see-all", "reviews")
                .query("page", page.to_string())
                .header("Accept-Language", accept_language(&request.country));
            let response = match self.client.send(&http_request).await {
                Ok(response) => response,
                Err(HttpError::Blocked(reason)) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Scrape),
                        &format!("Block detected on listing page {}: {}", page, reason),
                    );
                    return Err(BlockedError {
                        source_kind: SourceKind::Scrape,
                        reason,
                        partial: harvest,
                    });
                }
                Err(e) => {
                    sink.record(
                        EventLevel::Error,
                        Some(SourceKind::Scrape),
                        &format!("Listing page {} failed, stopping scrape: {}", page, e),
                    );
                    harvest.stop = StopReason::Failed;
                    break;
                }
            };

            let parsed = self.parse_page(&response.body, &response.url);
            if harvest.app_name.is_none() {
                harvest.app_name = parsed.app_name;
            }
            for failure in &parsed.failures {
                sink.record(EventLevel::Warn, Some(SourceKind::Scrape), &failure.to_string());
            }
            harvest.skipped += parsed.failures.len();
            harvest.pages_fetched += 1;

            if parsed.containers == 0 {
                debug!(page = page, "No review containers on page");
                harvest.stop = StopReason::Exhausted;
                break;
            }

            let mut added = 0;
            for entry in parsed.entries {
                if harvest.len() >= target {
                    break;
                }
                if seen.insert(entry_key(&entry)) {
                    harvest.entries.push(RawReviewEntry::Scraped(entry));
                    added += 1;
                }
            }
            sink.progress(SourceKind::Scrape, harvest.len(), target);
            debug!(
                page = page,
                containers = parsed.containers,
                added = added,
                total = harvest.len(),
                "Listing page processed"
            );

            if added == 0 && harvest.len() < target {
                debug!(page = page, "Listing page repeated earlier reviews");
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
            "Scrape finished"
        );
        Ok(harvest)
    }
}

/// Whitespace-collapsed text content
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of the first candidate that matches with non-empty content
fn first_text(container: ElementRef<'_>, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|sel| {
        container
            .select(sel)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// Identity of a container within one fetch: its id, or user, date and body
fn entry_key(entry: &ScrapedEntry) -> String {
    match &entry.review_id {
        Some(id) => format!("id:{}", id),
        None => format!(
            "{}|{}|{}",
            entry.user_name.as_deref().unwrap_or_default(),
            entry.date.as_deref().unwrap_or_default(),
            entry.text.as_deref().unwrap_or_default()
        ),
    }
}

/// First integer appearing in `text`, e.g. "12 people found this helpful"
pub fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Star count from an accessible label such as "4 out of 5" or "Оценка: 3 из 5"
pub fn parse_star_label(label: &str) -> Option<u8> {
    let stars = leading_number(label)?;
    if (1..=5).contains(&stars) {
        Some(stars as u8)
    } else {
        None
    }
}
