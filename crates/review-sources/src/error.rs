use crate::traits::Harvest;
use review_models::SourceKind;
use std::fmt;
use thiserror::Error;

/// Why a response was classified as an anti-automation block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Status(u16),
    Marker(String),
    UnexpectedHtml,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Status(code) => write!(f, "HTTP status {}", code),
            BlockReason::Marker(marker) => write!(f, "block marker '{}' in response body", marker),
            BlockReason::UnexpectedHtml => write!(f, "HTML document where JSON was expected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// Not retried
    #[error("request blocked: {0}")]
    Blocked(BlockReason),
    /// Transient failures on every attempt
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// A fetcher hit a block. Entries gathered before the block travel with it.
#[derive(Debug, Error)]
#[error("{source_kind} source blocked: {reason}")]
pub struct BlockedError {
    pub source_kind: SourceKind,
    pub reason: BlockReason,
    pub partial: Harvest,
}

/// One raw entry that could not be decoded. Never escapes a fetcher loop.
#[derive(Debug, Error)]
#[error("malformed {source_kind} entry: {message}")]
pub struct MalformedEntryError {
    pub source_kind: SourceKind,
    pub message: String,
}

impl MalformedEntryError {
    pub fn new(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self {
            source_kind,
            message: message.into(),
        }
    }
}
