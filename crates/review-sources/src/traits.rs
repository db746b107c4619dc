use crate::error::BlockedError;
use async_trait::async_trait;
use review_models::{RawReviewEntry, SourceKind};

/// Parameters handed to every fetcher for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub app_id: String,
    pub country: String,
    pub target_count: usize,
}

/// Why a fetcher stopped paginating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    Exhausted, // Page without new reviews or without review containers
    TargetReached,
    PageLimit,
    Failed, // Retries exhausted or an undecodable page
}

/// Raw entries gathered by one fetcher, in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Harvest {
    pub entries: Vec<RawReviewEntry>,
    pub app_name: Option<String>,
    pub pages_fetched: u32,
    pub skipped: usize,
    pub stop: StopReason,
}

impl Harvest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// Per-run event sink. Lives for exactly one collection run.
pub trait RunSink: Send + Sync {
    fn record(&self, level: EventLevel, source: Option<SourceKind>, message: &str);

    /// Called after every page with the running total for that source
    fn progress(&self, _source: SourceKind, _collected: usize, _target: usize) {}
}

/// Discards everything
pub struct NullSink;

impl RunSink for NullSink {
    fn record(&self, _level: EventLevel, _source: Option<SourceKind>, _message: &str) {}
}

#[async_trait]
pub trait ReviewFetcher: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Collect up to `request.target_count` raw entries.
    ///
    /// Transient failures end pagination and return what was gathered; a
    /// block returns `BlockedError` carrying the same partial harvest.
    async fn fetch(&self, request: &FetchRequest, sink: &dyn RunSink) -> Result<Harvest, BlockedError>;
}
