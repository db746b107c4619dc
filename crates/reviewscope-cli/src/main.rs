use clap::{ArgAction, Parser, Subcommand};
use commands::collect::CollectArgs;
use commands::{collect, config};
use review_config::PathManager;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reviewscope")]
#[command(about = "ReviewScope - Collect App Store reviews into a spreadsheet-ready CSV")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Configuration file (defaults to the platform config directory or $REVIEWSCOPE_HOME)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to this file, rotated daily
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect reviews for one app and export them to CSV
    #[command(long_about = "Collect reviews for one app: the review feed first, then the HTML review listing for whatever is still missing. Results are deduplicated, written to app_<id>_reviews.csv, and an error log is written next to it when the store blocks the run.")]
    Collect {
        /// App Store app id, with or without the "id" prefix (prompted for when omitted)
        #[arg(long, value_name = "ID")]
        app_id: Option<String>,

        /// Number of reviews to collect (clamped to the configured bounds)
        #[arg(long, value_name = "N")]
        target: Option<usize>,

        /// Two-letter store country code
        #[arg(long, value_name = "CC")]
        country: Option<String>,

        /// Directory for the CSV and error log
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Source chain, primary first: --sources=feed,scrape
        #[arg(long, value_name = "SOURCES")]
        sources: Option<String>,
    },
    /// Inspect or initialize configuration
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file without asking
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let config_file = cli.config.unwrap_or_else(|| PathManager::default().config_file());

    match cli.command {
        Commands::Collect {
            app_id,
            target,
            country,
            output_dir,
            sources,
        } => {
            let args = CollectArgs {
                app_id,
                target,
                country,
                output_dir,
                sources,
            };
            collect::run_collect(args, &config_file, &output).await
        }
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show);
            config::run_config(cmd, &config_file, &output)
        }
    }
}
