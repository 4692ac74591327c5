use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use musubi_eval::config;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Benchmark and tune the musubi retrieval backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark scenario and save its results
    Run {
        /// Scenario YAML file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Tune search parameters against a base scenario
    Tune {
        /// Tuning YAML file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Check a documents/queries dataset for consistency
    Validate {
        /// Documents JSONL file
        #[arg(long)]
        documents: Option<PathBuf>,

        /// Queries JSONL file
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Directory containing documents.jsonl and queries.jsonl
        #[arg(long)]
        dataset_dir: Option<PathBuf>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Install the stderr subscriber; `RUST_LOG` overrides the config's level
fn init_tracing(config_level: Option<&str>) {
    let fallback = config_level.map(level_directive).unwrap_or("info");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Map config level names (INFO, WARNING, ...) onto filter directives
fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => "info",
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Run { config: path } => {
            let cfg = config::load_scenario(&path);
            init_tracing(cfg.as_ref().ok().map(|c| c.log_level.as_str()));
            commands::run::execute(&cfg?)
        }
        Commands::Tune { config: path } => {
            let cfg = config::load_tuning(&path);
            init_tracing(cfg.as_ref().ok().map(|c| c.log_level.as_str()));
            let cfg = cfg?;
            let base = config::load_scenario(&cfg.base_scenario)
                .context("Failed to load base scenario for tuning")?;
            commands::tune::execute(&cfg, &base)
        }
        Commands::Validate {
            documents,
            queries,
            dataset_dir,
            json,
        } => {
            init_tracing(None);
            commands::validate::execute(commands::validate::ValidateOptions {
                documents,
                queries,
                dataset_dir,
                json,
            })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("Debug"), "debug");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("verbose"), "info");
    }
}
