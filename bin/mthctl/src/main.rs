//! ---
//! mth_section: "06-command-surface"
//! mth_subsection: "binary"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Control CLI driving harness runs."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mth_common::{init_tracing, HarnessConfig};
use mth_fixtures::Registry;
use mth_testharness::EXIT_HARNESS_ERROR;

mod list;
mod run;

/// Config file picked up from the working directory when nothing else is set.
const DEFAULT_CONFIG_FILE: &str = "mth.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Module test harness control utility",
    long_about = None
)]
struct Cli {
    /// Harness configuration file (defaults to MTH_CONFIG, then ./mth.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate templates, then generate and check scenarios for a module.
    Run(run::RunCommand),
    /// Run template static validation only.
    Templates(run::TemplatesCommand),
    /// List modules, scenarios and template validations.
    List(list::ListCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "harness error");
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    let loaded = HarnessConfig::load_with_source(cli.config.as_deref(), &[DEFAULT_CONFIG_FILE])?;
    init_tracing("mthctl", &loaded.config.logging)?;
    if let Some(source) = &loaded.source {
        tracing::debug!(config = %source.display(), "configuration loaded");
    }
    match cli.command {
        Commands::Run(cmd) => cmd.execute(loaded.config).await,
        Commands::Templates(cmd) => cmd.execute(loaded.config),
        Commands::List(cmd) => cmd.execute(loaded.config),
    }
}

pub(crate) fn load_registry(dir: &Path) -> Result<Registry> {
    Registry::load_dir(dir)
        .with_context(|| format!("failed to load fixtures from {}", dir.display()))
}

/// Write `rendered` to `output`, or stdout when unset.
pub(crate) fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write report to {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
