pub mod error;
pub mod factory;
pub mod feed;
pub mod http;
pub mod internal;
pub mod policy;
pub mod scrape;
pub mod traits;

pub use error::{BlockReason, BlockedError, HttpError, MalformedEntryError};
pub use factory::{build_fetchers, SourceFactory, SourceFactoryRegistry};
pub use feed::FeedFetcher;
pub use http::{HttpRequest, HttpResponse, ReviewHttpClient};
pub use internal::InternalFetcher;
pub use policy::{FixedPolicy, RandomizedPolicy, RequestPolicy};
pub use scrape::ScrapeFetcher;
pub use traits::{EventLevel, FetchRequest, Harvest, NullSink, ReviewFetcher, RunSink, StopReason};
