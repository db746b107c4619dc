use super::*;
use crate::journal::RunJournal;
use async_trait::async_trait;
use review_models::{FeedEntry, RawReviewEntry, ScrapedEntry};
use review_sources::{BlockReason, BlockedError, StopReason};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves entries from memory, honoring the requested target unless told not to
struct FakeFetcher {
    kind: SourceKind,
    entries: Vec<RawReviewEntry>,
    app_name: Option<String>,
    block_after: Option<usize>,
    ignore_target: bool,
    calls: Arc<AtomicUsize>,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl FakeFetcher {
    fn new(kind: SourceKind, entries: Vec<RawReviewEntry>) -> Self {
        Self {
            kind,
            entries,
            app_name: None,
            block_after: None,
            ignore_target: false,
            calls: Arc::new(AtomicUsize::new(0)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    fn blocked_after(mut self, count: usize) -> Self {
        self.block_after = Some(count);
        self
    }

    fn ignoring_target(mut self) -> Self {
        self.ignore_target = true;
        self
    }
}

#[async_trait]
impl ReviewFetcher for FakeFetcher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, request: &FetchRequest, _sink: &dyn RunSink) -> Result<Harvest, BlockedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.target_count);

        let limit = if self.ignore_target { usize::MAX } else { request.target_count };
        let mut harvest = Harvest {
            app_name: self.app_name.clone(),
            ..Harvest::default()
        };

        for (index, entry) in self.entries.iter().enumerate() {
            if Some(index) == self.block_after {
                return Err(BlockedError {
                    source_kind: self.kind,
                    reason: BlockReason::Status(429),
                    partial: harvest,
                });
            }
            if harvest.len() >= limit {
                harvest.stop = StopReason::TargetReached;
                return Ok(harvest);
            }
            harvest.entries.push(entry.clone());
        }

        if self.block_after == Some(self.entries.len()) {
            return Err(BlockedError {
                source_kind: self.kind,
                reason: BlockReason::Status(429),
                partial: harvest,
            });
        }
        harvest.stop = StopReason::Exhausted;
        Ok(harvest)
    }
}

fn feed_review(id: &str) -> RawReviewEntry {
    RawReviewEntry::Feed(FeedEntry {
        id: Some(id.to_string()),
        author: Some(format!("user {}", id)),
        rating: Some("5".to_string()),
        title: Some("Title".to_string()),
        content: Some(format!("Review {}", id)),
        page_url: "https://feed.test".to_string(),
        ..FeedEntry::default()
    })
}

fn scraped_review(id: Option<&str>, user: &str, text: &str) -> RawReviewEntry {
    RawReviewEntry::Scraped(ScrapedEntry {
        review_id: id.map(str::to_string),
        user_name: Some(user.to_string()),
        text: Some(text.to_string()),
        date: Some("2024-01-15".to_string()),
        rating: Some(4),
        page_url: "https://store.test".to_string(),
        ..ScrapedEntry::default()
    })
}

fn feed_reviews(prefix: &str, count: usize) -> Vec<RawReviewEntry> {
    (0..count).map(|i| feed_review(&format!("{}{}", prefix, i))).collect()
}

fn orchestrator(fetchers: Vec<Box<dyn ReviewFetcher>>) -> (CollectionOrchestrator, Arc<RunJournal>) {
    let journal = Arc::new(RunJournal::new());
    let orchestrator = CollectionOrchestrator::new(fetchers, CollectionConfig::default(), journal.clone());
    (orchestrator, journal)
}

fn assert_unique_ids(result: &CollectionResult) {
    let mut ids: Vec<&str> = result.reviews.iter().filter_map(|r| r.review_id.as_deref()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total, "duplicate review ids in result");
}

#[tokio::test]
async fn test_feed_exhausts_below_target() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 49)).named("Test App");
    let scrape = FakeFetcher::new(SourceKind::Scrape, Vec::new());
    let scrape_calls = scrape.calls.clone();
    let (orchestrator, _) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator
        .collect(&CollectionRequest::new("42").with_target(100))
        .await
        .unwrap();

    assert_eq!(result.reviews_collected(), 49);
    assert!(!result.blocked);
    assert_eq!(result.app_name, "Test App");
    assert!(result.reviews.iter().all(|r| r.app_name == "Test App"));
    assert_eq!(scrape_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_block_on_primary_skips_fallback() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 10)).blocked_after(0);
    let scrape = FakeFetcher::new(SourceKind::Scrape, feed_reviews("s", 10));
    let scrape_calls = scrape.calls.clone();
    let (orchestrator, journal) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator.collect(&CollectionRequest::new("42")).await.unwrap();

    assert!(result.blocked);
    assert!(result.is_empty());
    assert_eq!(scrape_calls.load(Ordering::SeqCst), 0);
    assert!(result.block_reason.as_deref().unwrap_or_default().contains("429"));

    let last = journal.events().pop().unwrap();
    assert_eq!(last.level, EventLevel::Error);
    assert!(last.message.contains("0 reviews collected before stopping"));
}

#[tokio::test]
async fn test_fallback_fills_remainder_and_dedups() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 30));
    let mut scraped: Vec<RawReviewEntry> = (0..39)
        .map(|i| scraped_review(Some(&format!("s{}", i)), "someone", &format!("text {}", i)))
        .collect();
    // Same review id as one of the feed reviews
    scraped.insert(10, scraped_review(Some("f5"), "user f5", "Review f5"));
    let scrape = FakeFetcher::new(SourceKind::Scrape, scraped);
    let requested = scrape.requested.clone();
    let (orchestrator, _) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator
        .collect(&CollectionRequest::new("42").with_target(100))
        .await
        .unwrap();

    assert_eq!(result.reviews_collected(), 69);
    assert_eq!(result.counts.duplicates_dropped, 1);
    assert_eq!(result.counts.fetched.get(&SourceKind::Feed), Some(&30));
    assert_eq!(result.counts.fetched.get(&SourceKind::Scrape), Some(&40));
    assert_eq!(*requested.lock().unwrap(), vec![70]);
    assert_unique_ids(&result);

    // Feed entries first, in fetch order
    assert_eq!(result.reviews[0].review_id.as_deref(), Some("f0"));
    assert_eq!(result.reviews[29].review_id.as_deref(), Some("f29"));
    assert_eq!(result.reviews[30].review_id.as_deref(), Some("s0"));
}

#[tokio::test]
async fn test_target_reached_by_primary() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 500));
    let scrape = FakeFetcher::new(SourceKind::Scrape, feed_reviews("s", 10));
    let scrape_calls = scrape.calls.clone();
    let (orchestrator, _) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator
        .collect(&CollectionRequest::new("42").with_target(10))
        .await
        .unwrap();

    let ids: Vec<&str> = result.reviews.iter().filter_map(|r| r.review_id.as_deref()).collect();
    assert_eq!(ids, vec!["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9"]);
    assert_eq!(scrape_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversupplying_source_is_truncated() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 25)).ignoring_target();
    let (orchestrator, _) = orchestrator(vec![Box::new(feed)]);

    let result = orchestrator
        .collect(&CollectionRequest::new("42").with_target(10))
        .await
        .unwrap();

    assert_eq!(result.reviews_collected(), 10);
    assert_eq!(result.counts.truncated, 15);
}

#[tokio::test]
async fn test_block_in_fallback_keeps_partial() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 20));
    let scrape = FakeFetcher::new(SourceKind::Scrape, feed_reviews("s", 20)).blocked_after(5);
    let (orchestrator, _) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator
        .collect(&CollectionRequest::new("42").with_target(100))
        .await
        .unwrap();

    assert!(result.blocked);
    assert_eq!(result.reviews_collected(), 25);
}

#[tokio::test]
async fn test_composite_identity_for_scraped_reviews() {
    let scrape = FakeFetcher::new(
        SourceKind::Scrape,
        vec![
            scraped_review(None, "Anna", "Great app"),
            scraped_review(None, "Anna", "Great app"),
            scraped_review(None, "Boris", "Great app"),
        ],
    );
    let (orchestrator, _) = orchestrator(vec![Box::new(scrape)]);

    let result = orchestrator.collect(&CollectionRequest::new("42")).await.unwrap();

    assert_eq!(result.reviews_collected(), 2);
    assert_eq!(result.counts.duplicates_dropped, 1);
}

#[tokio::test]
async fn test_app_name_from_fallback_applies_to_all() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 3));
    let scrape = FakeFetcher::new(SourceKind::Scrape, feed_reviews("s", 3)).named("Scraped Name");
    let (orchestrator, _) = orchestrator(vec![Box::new(feed), Box::new(scrape)]);

    let result = orchestrator.collect(&CollectionRequest::new("42")).await.unwrap();

    assert_eq!(result.app_name, "Scraped Name");
    assert!(result.reviews.iter().all(|r| r.app_name == "Scraped Name"));
}

#[tokio::test]
async fn test_validation_happens_before_fetching() {
    let feed = FakeFetcher::new(SourceKind::Feed, feed_reviews("f", 3));
    let calls = feed.calls.clone();
    let (orchestrator, _) = orchestrator(vec![Box::new(feed)]);

    let err = orchestrator.collect(&CollectionRequest::new("   ")).await.unwrap_err();
    assert_eq!(err, ValidationError::EmptyAppId);

    let err = orchestrator
        .collect(&CollectionRequest::new("42").with_target(0))
        .await
        .unwrap_err();
    assert_eq!(err, ValidationError::ZeroTarget);

    let err = orchestrator
        .collect(&CollectionRequest::new("42").with_country("rus"))
        .await
        .unwrap_err();
    assert_eq!(err, ValidationError::InvalidCountry("rus".to_string()));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_validate_clamps_and_normalizes() {
    let (orchestrator, _) = orchestrator(vec![Box::new(FakeFetcher::new(SourceKind::Feed, Vec::new()))]);

    let fetch = orchestrator
        .validate(&CollectionRequest::new(" id1234 ").with_target(5).with_country("RU"))
        .unwrap();
    assert_eq!(fetch.app_id, "1234");
    assert_eq!(fetch.country, "ru");
    assert_eq!(fetch.target_count, 10);

    let fetch = orchestrator.validate(&CollectionRequest::new("42").with_target(5000)).unwrap();
    assert_eq!(fetch.target_count, 1000);

    let fetch = orchestrator.validate(&CollectionRequest::new("42")).unwrap();
    assert_eq!(fetch.target_count, 1000);
}

#[test]
fn test_normalize_app_id() {
    assert_eq!(normalize_app_id("id389801252").unwrap(), "389801252");
    assert_eq!(normalize_app_id("com.example.app").unwrap(), "com.example.app");
    assert_eq!(normalize_app_id("idea").unwrap(), "idea");
    assert!(matches!(normalize_app_id("../etc"), Err(ValidationError::InvalidAppId(_))));
    assert!(matches!(normalize_app_id("a b"), Err(ValidationError::InvalidAppId(_))));
}

#[test]
fn test_no_sources_is_a_validation_error() {
    let (orchestrator, _) = orchestrator(Vec::new());
    assert_eq!(
        orchestrator.validate(&CollectionRequest::new("42")).unwrap_err(),
        ValidationError::NoSources
    );
}
