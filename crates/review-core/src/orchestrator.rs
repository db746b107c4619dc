use crate::dedup::DedupSet;
use crate::error::ValidationError;
use crate::normalize::{normalize, NormalizeContext};
use review_config::CollectionConfig;
use review_models::{CollectionCounts, CollectionResult, SourceKind};
use review_sources::{EventLevel, FetchRequest, Harvest, ReviewFetcher, RunSink};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Caller parameters for one run. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRequest {
    pub app_id: String,
    pub target_count: Option<usize>,
    pub country: Option<String>,
}

impl CollectionRequest {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: usize) -> Self {
        self.target_count = Some(target);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Drives the primary source and then each fallback while the run is short of
/// its target, normalizing and deduplicating as entries arrive.
pub struct CollectionOrchestrator {
    fetchers: Vec<Box<dyn ReviewFetcher>>,
    config: CollectionConfig,
    sink: Arc<dyn RunSink>,
}

impl CollectionOrchestrator {
    pub fn new(fetchers: Vec<Box<dyn ReviewFetcher>>, config: CollectionConfig, sink: Arc<dyn RunSink>) -> Self {
        Self { fetchers, config, sink }
    }

    pub fn source_order(&self) -> Vec<SourceKind> {
        self.fetchers.iter().map(|f| f.kind()).collect()
    }

    /// INIT: check the request and resolve defaults. No network activity.
    pub fn validate(&self, request: &CollectionRequest) -> Result<FetchRequest, ValidationError> {
        if self.fetchers.is_empty() {
            return Err(ValidationError::NoSources);
        }

        let app_id = normalize_app_id(&request.app_id)?;

        let country = request
            .country
            .as_deref()
            .unwrap_or(&self.config.country)
            .trim()
            .to_lowercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountry(country));
        }

        let requested = request.target_count.unwrap_or(self.config.default_target);
        if requested == 0 {
            return Err(ValidationError::ZeroTarget);
        }
        let target_count = self.config.clamp_target(requested);
        if target_count != requested {
            debug!(requested = requested, target = target_count, "Target count clamped to configured bounds");
        }

        Ok(FetchRequest {
            app_id,
            country,
            target_count,
        })
    }

    /// Run the whole pipeline. Only validation errors are returned; blocks and
    /// source failures are reported through the result.
    #[instrument(skip(self, request), fields(app_id = %request.app_id))]
    pub async fn collect(&self, request: &CollectionRequest) -> Result<CollectionResult, ValidationError> {
        let fetch = self.validate(request)?;
        let target = fetch.target_count;

        self.sink.record(
            EventLevel::Info,
            None,
            &format!(
                "Collecting up to {} reviews for app {} ({}), sources: {}",
                target,
                fetch.app_id,
                fetch.country,
                self.source_order().iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" -> ")
            ),
        );

        let mut counts = CollectionCounts::default();
        let mut dedup = DedupSet::new(self.config.dedup_text_prefix);
        let mut reviews = Vec::new();
        let mut app_name: Option<String> = None;
        let mut block_reason: Option<String> = None;

        for (stage, fetcher) in self.fetchers.iter().enumerate() {
            let remaining = target.saturating_sub(reviews.len());
            if remaining == 0 {
                break;
            }
            let kind = fetcher.kind();
            if stage > 0 {
                self.sink.record(
                    EventLevel::Info,
                    Some(kind),
                    &format!("{} of {} reviews so far, falling back to {} for {} more", reviews.len(), target, kind, remaining),
                );
            }

            let stage_request = FetchRequest {
                target_count: remaining,
                ..fetch.clone()
            };
            let harvest: Harvest = match fetcher.fetch(&stage_request, self.sink.as_ref()).await {
                Ok(harvest) => harvest,
                Err(blocked) => {
                    warn!(source = %kind, reason = %blocked.reason, kept = blocked.partial.len(), "Source blocked, ending run");
                    block_reason = Some(blocked.to_string());
                    blocked.partial
                }
            };

            *counts.fetched.entry(kind).or_insert(0) += harvest.len();
            counts.malformed_dropped += harvest.skipped;
            if app_name.is_none() {
                app_name = harvest.app_name.clone().filter(|name| !name.trim().is_empty());
            }

            let ctx = NormalizeContext {
                app_id: &fetch.app_id,
                app_name: app_name.as_deref().unwrap_or(""),
                country: &fetch.country,
            };
            for raw in &harvest.entries {
                match normalize(raw, &ctx) {
                    Some(review) => {
                        if dedup.insert(&review) {
                            reviews.push(review);
                        }
                    }
                    None => counts.malformed_dropped += 1,
                }
            }

            info!(
                source = %kind,
                fetched = harvest.len(),
                unique_total = reviews.len(),
                stop = ?harvest.stop,
                "Source stage finished"
            );

            if block_reason.is_some() {
                break;
            }
        }

        // DONE
        if reviews.len() > target {
            counts.truncated = reviews.len() - target;
            reviews.truncate(target);
        }
        let app_name = app_name.unwrap_or_default();
        for review in &mut reviews {
            review.app_name.clone_from(&app_name);
        }
        counts.duplicates_dropped = dedup.dropped();
        counts.reviews_collected = reviews.len();

        let blocked = block_reason.is_some();
        match &block_reason {
            Some(reason) => self.sink.record(
                EventLevel::Error,
                None,
                &format!("Collection stopped by block ({}); {} reviews collected before stopping", reason, reviews.len()),
            ),
            None => self.sink.record(
                EventLevel::Info,
                None,
                &format!("Collected {} of {} requested reviews", reviews.len(), target),
            ),
        }

        Ok(CollectionResult {
            app_id: fetch.app_id,
            app_name,
            country: fetch.country,
            target_count: target,
            reviews,
            blocked,
            block_reason,
            counts,
        })
    }
}

/// Accepts "12345" or "id12345"; the id ends up in file names
pub fn normalize_app_id(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let id = trimmed
        .strip_prefix("id")
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(trimmed);

    if id.is_empty() {
        return Err(ValidationError::EmptyAppId);
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(ValidationError::InvalidAppId(id.to_string()));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests;
