use review_models::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("collection.min_target ({min}) must be between 1 and max_target ({max})")]
    TargetBounds { min: usize, max: usize },
    #[error("collection.country must be a two-letter store code, got '{0}'")]
    Country(String),
    #[error("http.max_attempts must be at least 1")]
    NoAttempts,
    #[error("http.min_delay_ms ({min}) is greater than http.max_delay_ms ({max})")]
    DelayBounds { min: u64, max: u64 },
    #[error("http.user_agents cannot be empty")]
    NoUserAgents,
    #[error("sources.order cannot be empty")]
    NoSources,
    #[error("source '{0}' appears more than once in sources.order")]
    DuplicateSource(SourceKind),
    #[error("sources.order names 'internal' but sources.internal is disabled")]
    InternalDisabled,
    #[error("sources.internal.url is required when the internal endpoint is enabled")]
    InternalUrlMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_min_target")]
    pub min_target: usize,
    #[serde(default = "default_max_target")]
    pub max_target: usize,
    #[serde(default = "default_max_target")]
    pub default_target: usize,
    /// Characters of review text in the fallback dedup identity
    #[serde(default = "default_dedup_text_prefix")]
    pub dedup_text_prefix: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Case-insensitive substrings that mark a CAPTCHA or block page
    #[serde(default = "default_block_markers")]
    pub block_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// First entry is the primary source, the rest are fallbacks in order
    #[serde(default = "default_source_order")]
    pub order: Vec<SourceKind>,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub internal: InternalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    #[serde(default = "default_feed_sort")]
    pub sort: String,
    #[serde(default = "default_feed_max_pages")]
    pub max_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_base_url")]
    pub base_url: String,
    #[serde(default = "default_scrape_max_pages")]
    pub max_pages: u32,
}

/// Store-internal POST endpoint. The positional layout is not documented
/// upstream and must be confirmed against live responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_internal_page_param")]
    pub page_param: String,
    #[serde(default = "default_internal_sort_param")]
    pub sort_param: String,
    #[serde(default = "default_internal_sort")]
    pub sort: String,
    /// Anti-JSON guard stripped before parsing
    #[serde(default = "default_internal_strip_prefix")]
    pub strip_prefix: String,
    /// Index path from the document root to the review array
    #[serde(default)]
    pub reviews_path: Vec<usize>,
    #[serde(default = "default_internal_max_pages")]
    pub max_pages: u32,
    #[serde(default)]
    pub extra_form: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: PositionalFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionalFields {
    #[serde(default = "default_position_id")]
    pub id: Option<usize>,
    #[serde(default = "default_position_user")]
    pub user: usize,
    #[serde(default = "default_position_rating")]
    pub rating: usize,
    #[serde(default = "default_position_text")]
    pub text: usize,
    #[serde(default = "default_position_date")]
    pub date: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_country() -> String {
    "ru".to_string()
}

fn default_min_target() -> usize {
    10
}

fn default_max_target() -> usize {
    1000
}

fn default_dedup_text_prefix() -> usize {
    120
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    1500
}

pub fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_block_markers() -> Vec<String> {
    [
        "captcha",
        "are you a robot",
        "unusual traffic",
        "access denied",
        "too many requests",
        "verify you are human",
        "не робот",
        "доступ ограничен",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_source_order() -> Vec<SourceKind> {
    vec![SourceKind::Feed, SourceKind::Scrape]
}

fn default_feed_base_url() -> String {
    "https://itunes.apple.com".to_string()
}

fn default_feed_sort() -> String {
    "mostrecent".to_string()
}

fn default_feed_max_pages() -> u32 {
    10 // The customer review feed stops serving after page 10
}

fn default_scrape_base_url() -> String {
    "https://apps.apple.com".to_string()
}

fn default_scrape_max_pages() -> u32 {
    50
}

fn default_internal_page_param() -> String {
    "page".to_string()
}

fn default_internal_sort_param() -> String {
    "sort".to_string()
}

fn default_internal_sort() -> String {
    "newest".to_string()
}

fn default_internal_strip_prefix() -> String {
    ")]}'".to_string()
}

fn default_internal_max_pages() -> u32 {
    20
}

fn default_position_id() -> Option<usize> {
    Some(0)
}

fn default_position_user() -> usize {
    1
}

fn default_position_rating() -> usize {
    2
}

fn default_position_text() -> usize {
    4
}

fn default_position_date() -> usize {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            country: default_country(),
            min_target: default_min_target(),
            max_target: default_max_target(),
            default_target: default_max_target(),
            dedup_text_prefix: default_dedup_text_prefix(),
        }
    }
}

impl CollectionConfig {
    /// Clamp a requested target into the configured bounds
    pub fn clamp_target(&self, requested: usize) -> usize {
        requested.clamp(self.min_target, self.max_target)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agents: default_user_agents(),
            block_markers: default_block_markers(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: default_source_order(),
            feed: FeedConfig::default(),
            scrape: ScrapeConfig::default(),
            internal: InternalConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            sort: default_feed_sort(),
            max_pages: default_feed_max_pages(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_scrape_base_url(),
            max_pages: default_scrape_max_pages(),
        }
    }
}

impl Default for InternalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            page_param: default_internal_page_param(),
            sort_param: default_internal_sort_param(),
            sort: default_internal_sort(),
            extra_form: BTreeMap::new(),
            strip_prefix: default_internal_strip_prefix(),
            reviews_path: Vec::new(),
            fields: PositionalFields::default(),
            max_pages: default_internal_max_pages(),
        }
    }
}

impl Default for PositionalFields {
    fn default() -> Self {
        Self {
            id: default_position_id(),
            user: default_position_user(),
            rating: default_position_rating(),
            text: default_position_text(),
            date: default_position_date(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Missing file means built-in defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let collection = &self.collection;
        if collection.min_target == 0 || collection.min_target > collection.max_target {
            return Err(ConfigError::TargetBounds {
                min: collection.min_target,
                max: collection.max_target,
            });
        }

        let country = collection.country.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Country(collection.country.clone()));
        }

        if self.http.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.http.min_delay_ms > self.http.max_delay_ms {
            return Err(ConfigError::DelayBounds {
                min: self.http.min_delay_ms,
                max: self.http.max_delay_ms,
            });
        }
        if self.http.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::NoUserAgents);
        }

        if self.sources.order.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = Vec::new();
        for kind in &self.sources.order {
            if seen.contains(kind) {
                return Err(ConfigError::DuplicateSource(*kind));
            }
            seen.push(*kind);
        }

        if self.sources.order.contains(&SourceKind::Internal) && !self.sources.internal.enabled {
            return Err(ConfigError::InternalDisabled);
        }
        if self.sources.internal.enabled && self.sources.internal.url.trim().is_empty() {
            return Err(ConfigError::InternalUrlMissing);
        }

        Ok(())
    }
}
