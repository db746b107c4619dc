/// Fetcher factory pattern for building the source chain from configuration
///
/// Every source kind has a factory; the registry builds fetchers in the
/// order the run asks for them, all sharing one HTTP client.

use crate::feed::FeedFetcher;
use crate::http::ReviewHttpClient;
use crate::internal::InternalFetcher;
use crate::scrape::ScrapeFetcher;
use crate::traits::ReviewFetcher;
use anyhow::{anyhow, Result};
use review_config::Config;
use review_models::SourceKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating fetchers from configuration
pub trait SourceFactory: Send + Sync {
    fn source_kind(&self) -> SourceKind;

    /// Returns None if the source is disabled in configuration
    fn create_fetcher(
        &self,
        config: &Config,
        client: Arc<ReviewHttpClient>,
    ) -> Result<Option<Box<dyn ReviewFetcher>>>;

    fn validate_config(&self, _config: &Config) -> Result<()> {
        Ok(())
    }
}

pub struct SourceFactoryRegistry {
    factories: HashMap<SourceKind, Box<dyn SourceFactory>>,
}

impl SourceFactoryRegistry {
    /// Create a new registry with all built-in factories registered
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register(Box::new(FeedSourceFactory));
        registry.register(Box::new(ScrapeSourceFactory));
        registry.register(Box::new(InternalSourceFactory));

        registry
    }

    pub fn register(&mut self, factory: Box<dyn SourceFactory>) {
        self.factories.insert(factory.source_kind(), factory);
    }

    /// Build fetchers for `order`, primary first. Disabled sources are an error
    /// since the caller asked for them explicitly.
    pub fn build_chain(
        &self,
        config: &Config,
        order: &[SourceKind],
        client: Arc<ReviewHttpClient>,
    ) -> Result<Vec<Box<dyn ReviewFetcher>>> {
        let mut fetchers = Vec::with_capacity(order.len());

        for kind in order {
            let factory = self
                .factories
                .get(kind)
                .ok_or_else(|| anyhow!("No factory registered for source '{}'", kind))?;
            factory.validate_config(config)?;

            match factory.create_fetcher(config, Arc::clone(&client))? {
                Some(fetcher) => fetchers.push(fetcher),
                None => return Err(anyhow!("Source '{}' is disabled in configuration", kind)),
            }
        }

        if fetchers.is_empty() {
            return Err(anyhow!("No review sources selected"));
        }

        Ok(fetchers)
    }
}

impl Default for SourceFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the chain configured in `sources.order` with a client from `http`
pub fn build_fetchers(config: &Config) -> Result<Vec<Box<dyn ReviewFetcher>>> {
    let client = Arc::new(ReviewHttpClient::from_config(&config.http)?);
    SourceFactoryRegistry::new().build_chain(config, &config.sources.order, client)
}

struct FeedSourceFactory;

impl SourceFactory for FeedSourceFactory {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    fn create_fetcher(
        &self,
        config: &Config,
        client: Arc<ReviewHttpClient>,
    ) -> Result<Option<Box<dyn ReviewFetcher>>> {
        Ok(Some(Box::new(FeedFetcher::new(client, config.sources.feed.clone()))))
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        if config.sources.feed.base_url.trim().is_empty() {
            return Err(anyhow!("Feed source is selected but feed.base_url is empty"));
        }
        Ok(())
    }
}

struct ScrapeSourceFactory;

impl SourceFactory for ScrapeSourceFactory {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    fn create_fetcher(
        &self,
        config: &Config,
        client: Arc<ReviewHttpClient>,
    ) -> Result<Option<Box<dyn ReviewFetcher>>> {
        let fetcher = ScrapeFetcher::new(client, config.sources.scrape.clone())?;
        Ok(Some(Box::new(fetcher)))
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        if config.sources.scrape.base_url.trim().is_empty() {
            return Err(anyhow!("Scrape source is selected but scrape.base_url is empty"));
        }
        Ok(())
    }
}

struct InternalSourceFactory;

impl SourceFactory for InternalSourceFactory {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Internal
    }

    fn create_fetcher(
        &self,
        config: &Config,
        client: Arc<ReviewHttpClient>,
    ) -> Result<Option<Box<dyn ReviewFetcher>>> {
        let internal = &config.sources.internal;
        if !internal.enabled {
            return Ok(None);
        }
        Ok(Some(Box::new(InternalFetcher::new(client, internal.clone()))))
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        let internal = &config.sources.internal;
        if internal.enabled && internal.url.trim().is_empty() {
            return Err(anyhow!("Internal source is enabled but internal.url is not configured"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FixedPolicy;

    fn client() -> Arc<ReviewHttpClient> {
        let config = Config::default();
        Arc::new(ReviewHttpClient::new(&config.http, Arc::new(FixedPolicy::immediate())).unwrap())
    }

    #[test]
    fn test_default_chain_is_feed_then_scrape() {
        let config = Config::default();
        let chain = SourceFactoryRegistry::new()
            .build_chain(&config, &config.sources.order, client())
            .unwrap();

        let kinds: Vec<SourceKind> = chain.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, vec![SourceKind::Feed, SourceKind::Scrape]);
    }

    #[test]
    fn test_custom_order_is_respected() {
        let config = Config::default();
        let chain = SourceFactoryRegistry::new()
            .build_chain(&config, &[SourceKind::Scrape], client())
            .unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].kind(), SourceKind::Scrape);
    }

    #[test]
    fn test_disabled_internal_source_is_rejected() {
        let config = Config::default();
        let err = SourceFactoryRegistry::new()
            .build_chain(&config, &[SourceKind::Internal], client())
            .err()
            .unwrap();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_enabled_internal_source_without_url_is_rejected() {
        let mut config = Config::default();
        config.sources.internal.enabled = true;
        let err = SourceFactoryRegistry::new()
            .build_chain(&config, &[SourceKind::Internal], client())
            .err()
            .unwrap();
        assert!(err.to_string().contains("internal.url"));
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let config = Config::default();
        assert!(SourceFactoryRegistry::new().build_chain(&config, &[], client()).is_err());
    }
}
