pub mod config;
pub mod paths;

pub use config::{
    CollectionConfig, Config, ConfigError, FeedConfig, HttpConfig, InternalConfig, OutputConfig,
    PositionalFields, ScrapeConfig, SourcesConfig,
};
pub use paths::{home_override, PathManager};
