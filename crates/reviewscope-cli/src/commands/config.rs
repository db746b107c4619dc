use super::collect_ui::is_interactive;
use super::prompts;
use crate::output::{Output, OutputFormat};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use review_config::Config;
use serde_json::json;
use std::path::Path;

pub fn run_config(cmd: crate::ConfigCommands, config_file: &Path, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show => show_config(config_file, output),
        crate::ConfigCommands::Init { force } => init_config(config_file, force, output),
        crate::ConfigCommands::Path => {
            match output.format() {
                OutputFormat::Human => println!("{}", config_file.display()),
                OutputFormat::Json | OutputFormat::JsonPretty => {
                    output.json(&json!({ "config_file": config_file.display().to_string() }));
                }
            }
            Ok(())
        }
    }
}

fn show_config(config_file: &Path, output: &Output) -> Result<()> {
    let exists = config_file.exists();
    let config = Config::load_or_default(config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let validation = config.validate();

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            let mut info_table = Table::new();
            info_table.set_header(vec![
                Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
                Cell::new(config_file.display().to_string()),
            ]);
            info_table.add_row(vec![
                Cell::new("Status"),
                Cell::new(if exists {
                    "loaded".green().to_string()
                } else {
                    "not found, using defaults".bright_black().to_string()
                }),
            ]);
            info_table.add_row(vec![
                Cell::new("Valid"),
                Cell::new(match &validation {
                    Ok(()) => "✓".green().to_string(),
                    Err(e) => format!("{} {}", "✗".red(), e),
                }),
            ]);
            info_table.load_preset(comfy_table::presets::UTF8_FULL);
            info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", info_table);
            println!();

            let mut sources_table = Table::new();
            sources_table.set_header(vec![
                Cell::new("Collection")
                    .fg(comfy_table::Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
            ]);
            let order: Vec<&str> = config.sources.order.iter().map(|k| k.as_str()).collect();
            sources_table.add_row(vec![Cell::new("Country"), Cell::new(&config.collection.country)]);
            sources_table.add_row(vec![
                Cell::new("Target"),
                Cell::new(format!(
                    "{} (allowed {}-{})",
                    config.collection.default_target, config.collection.min_target, config.collection.max_target
                )),
            ]);
            sources_table.add_row(vec![Cell::new("Source order"), Cell::new(order.join(" -> "))]);
            sources_table.add_row(vec![
                Cell::new("Internal endpoint"),
                Cell::new(if config.sources.internal.enabled {
                    "✓".green().to_string()
                } else {
                    "✗".red().to_string()
                }),
            ]);
            sources_table.add_row(vec![
                Cell::new("Output directory"),
                Cell::new(config.output.dir.display().to_string()),
            ]);
            sources_table.load_preset(comfy_table::presets::UTF8_FULL);
            sources_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", sources_table);
            println!();

            let rendered = toml::to_string_pretty(&config).map_err(|e| eyre!("Failed to render config: {}", e))?;
            println!("{}", rendered);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file.display().to_string(),
                "exists": exists,
                "valid": validation.is_ok(),
                "validation_error": validation.err().map(|e| e.to_string()),
                "config": config,
            }));
        }
    }

    Ok(())
}

fn init_config(config_file: &Path, force: bool, output: &Output) -> Result<()> {
    if config_file.exists() && !force {
        let overwrite = is_interactive()
            && prompts::prompt_yes_no(
                &format!("{} already exists. Overwrite with defaults?", config_file.display()),
                Some(false),
            )?;
        if !overwrite {
            output.warn(format!(
                "Configuration already exists at {} (use --force to overwrite)",
                config_file.display()
            ));
            return Ok(());
        }
    }

    Config::default()
        .save_to_file(config_file)
        .map_err(|e| eyre!("Failed to write config to {}: {}", config_file.display(), e))?;
    output.success(format!("Default configuration written to {}", config_file.display()));
    Ok(())
}
