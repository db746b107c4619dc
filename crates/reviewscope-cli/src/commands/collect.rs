use super::collect_ui::{is_interactive, preview_table, CollectUI};
use super::prompts;
use crate::output::{Output, OutputFormat};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use review_config::Config;
use review_core::{CollectionOrchestrator, CollectionRequest, CsvExporter, RunJournal};
use review_models::SourceKind;
use review_sources::build_fetchers;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-run overrides from the command line
#[derive(Debug, Default)]
pub struct CollectArgs {
    pub app_id: Option<String>,
    pub target: Option<usize>,
    pub country: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub sources: Option<String>,
}

pub async fn run_collect(args: CollectArgs, config_file: &Path, output: &Output) -> Result<()> {
    tracing::debug!(config = %config_file.display(), "Collect command started");

    let mut config = Config::load_or_default(config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    apply_overrides(&mut config, &args)?;
    config
        .validate()
        .map_err(|e| eyre!("Configuration validation failed: {}", e))?;

    let app_id = match args.app_id {
        Some(app_id) => app_id,
        None if is_interactive() => prompts::prompt_app_id(output)?,
        None => return Err(eyre!("--app-id is required when not running interactively")),
    };

    let fetchers = build_fetchers(&config).map_err(|e| eyre!("Failed to create review sources: {}", e))?;

    let ui = CollectUI::new(output.is_human() && !output.is_quiet());
    let journal = Arc::new(RunJournal::new().with_progress(ui.progress_callback()));
    let orchestrator = CollectionOrchestrator::new(fetchers, config.collection.clone(), journal.clone());

    let mut request = CollectionRequest::new(app_id).with_country(config.collection.country.clone());
    if let Some(target) = args.target {
        request = request.with_target(target);
    }

    let result = match orchestrator.collect(&request).await {
        Ok(result) => result,
        Err(e) => {
            ui.abandon();
            return Err(eyre!("Invalid request: {}", e));
        }
    };
    ui.finish(format!("Collected {} reviews", result.reviews_collected()));

    let exporter = CsvExporter::new(&config.output.dir);
    let report = exporter
        .export(&result, &journal.events())
        .wrap_err("Failed to export reviews")?;

    match output.format() {
        OutputFormat::Human => {
            if !result.is_empty() && !output.is_quiet() {
                println!("{}", preview_table(&result.reviews));
            }

            let name = if result.app_name.is_empty() {
                format!("app {}", result.app_id)
            } else {
                format!("{} ({})", result.app_name, result.app_id)
            };
            output.success(format!(
                "Collected {} of {} requested reviews for {}",
                result.reviews_collected(),
                result.target_count,
                name
            ));
            let sources: Vec<String> = result
                .counts
                .fetched
                .iter()
                .map(|(kind, count)| format!("{} {}", kind, count))
                .collect();
            output.info(format!(
                "Fetched: {} | duplicates dropped: {} | unusable entries: {}",
                if sources.is_empty() { "nothing".to_string() } else { sources.join(", ") },
                result.counts.duplicates_dropped,
                result.counts.malformed_dropped
            ));
            output.info(format!("CSV: {}", report.csv_path.display()));

            if result.blocked {
                output.warn(format!(
                    "Collection was blocked ({}). Partial results were saved.",
                    result.block_reason.as_deref().unwrap_or("block detected")
                ));
                if let Some(log) = &report.error_log {
                    output.warn(format!("Error log: {}", log.display()));
                }
            } else if result.is_empty() {
                output.warn("No reviews found for this app and country");
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "reviews": result.reviews,
                "blocked": result.blocked,
                "reviews_collected": result.reviews_collected(),
                "csv_path": report.csv_path.display().to_string(),
                "error_log": report.error_log.as_ref().map(|p| p.display().to_string()),
            }));
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &CollectArgs) -> Result<()> {
    if let Some(country) = &args.country {
        config.collection.country = country.trim().to_lowercase();
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(sources) = &args.sources {
        config.sources.order = parse_sources(sources)?;
        // Naming the internal endpoint on the command line turns it on
        if config.sources.order.contains(&SourceKind::Internal) {
            config.sources.internal.enabled = true;
        }
    }
    Ok(())
}

fn parse_sources(list: &str) -> Result<Vec<SourceKind>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<SourceKind>().map_err(|e| eyre!("{}", e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            parse_sources("feed, scrape").unwrap(),
            vec![SourceKind::Feed, SourceKind::Scrape]
        );
        assert_eq!(parse_sources("html,api").unwrap(), vec![SourceKind::Scrape, SourceKind::Feed]);
        assert!(parse_sources("feed,ftp").is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let mut config = Config::default();
        let args = CollectArgs {
            country: Some("US".to_string()),
            output_dir: Some(PathBuf::from("/tmp/out")),
            sources: Some("scrape".to_string()),
            ..CollectArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.collection.country, "us");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.sources.order, vec![SourceKind::Scrape]);
        assert!(!config.sources.internal.enabled);
    }

    #[test]
    fn test_internal_source_without_url_fails_validation() {
        let mut config = Config::default();
        let args = CollectArgs {
            sources: Some("internal".to_string()),
            ..CollectArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert!(config.validate().is_err());
    }
}
