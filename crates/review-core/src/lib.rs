pub mod dedup;
pub mod error;
pub mod export;
pub mod journal;
pub mod normalize;
pub mod orchestrator;

pub use dedup::{DedupKey, DedupSet};
pub use error::{ExportError, ValidationError};
pub use export::{CsvExporter, ExportReport};
pub use journal::{RunEvent, RunJournal};
pub use normalize::{normalize, parse_flexible_date, NormalizeContext};
pub use orchestrator::{normalize_app_id, CollectionOrchestrator, CollectionRequest};
