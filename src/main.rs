mod config;
mod convert;
mod dump;
mod errors;
mod filters;
mod namespace;
mod output;
mod pipeline;
mod plugins;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Env;

use crate::{
    config::Config,
    convert::ReferenceScanConverter,
    errors::Result,
    output::PageSnapshot,
    pipeline::{Pipeline, RunSummary},
};

#[derive(Debug, Parser)]
#[command(
    name = "wiki_migrate",
    version,
    about = "Convert a MediaWiki XML export into per-page directories"
)]
struct Cli {
    /// Configuration file (defaults to ./wiki_migrate.toml when present).
    #[arg(long, global = true, value_name = "PATH", env = "WIKI_MIGRATE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the migration (default).
    Convert(ConvertArgs),
    /// Print a page directory written by a previous run.
    Show {
        #[arg(value_name = "PAGE_DIR")]
        dir: PathBuf,
        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the filter and resolver ids this build knows.
    Plugins,
}

#[derive(Debug, Default, Args)]
struct ConvertArgs {
    /// Export file, overrides `source_dump`.
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,
    /// Output root, overrides `target_path`.
    #[arg(long, value_name = "PATH")]
    target: Option<PathBuf>,
}

fn convert(mut config: Config, args: ConvertArgs) -> Result<RunSummary> {
    if let Some(source) = args.source {
        config.source_dump = source;
    }
    if let Some(target) = args.target {
        config.target_path = target;
    }
    Pipeline::new(&config, Box::new(ReferenceScanConverter)).run()
}

fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Convert(ConvertArgs::default())) {
        Commands::Convert(args) => match convert(config, args) {
            Ok(summary) => {
                log::info!(
                    "wrote {} page(s) into {} namespace(s)",
                    summary.pages_written,
                    summary.per_namespace.len()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("[{}] migration aborted: {}", e.kind(), e);
                ExitCode::FAILURE
            }
        },
        Commands::Show { dir, json } => match PageSnapshot::read_from(&dir) {
            Ok(snapshot) if json => match serde_json::to_string_pretty(&snapshot) {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("Failed to serialize {:?}: {}", dir, e);
                    ExitCode::FAILURE
                }
            },
            Ok(snapshot) => {
                println!("{}", snapshot);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to read {:?}: {}", dir, e);
                ExitCode::FAILURE
            }
        },
        Commands::Plugins => {
            println!("{}", plugins::known_ids());
            ExitCode::SUCCESS
        }
    }
}
