pub mod raw;
pub mod result;
pub mod review;
pub mod source;

pub use raw::{FeedEntry, InternalEntry, RawReviewEntry, ScrapedEntry};
pub use result::{CollectionCounts, CollectionResult};
pub use review::CanonicalReview;
pub use source::{SourceKind, UnknownSource};
