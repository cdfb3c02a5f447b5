//! ---
//! mth_section: "06-command-surface"
//! mth_subsection: "binary"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Control CLI driving harness runs."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args};
use mth_common::HarnessConfig;
use mth_logging::{mth_info, mth_warn, LogContext};
use mth_testharness::{
    abort_channel, check_module_templates, CommandGenerator, FsTemplateStore, Harness,
    HarnessOptions, Report,
};

use crate::{emit, load_registry, OutputFormat};

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Module whose scenarios should run.
    #[arg(long, value_name = "ID")]
    module: String,

    /// Restrict the run to the named scenario (repeatable).
    #[arg(long = "scenario", value_name = "NAME", action = ArgAction::Append)]
    scenarios: Vec<String>,

    /// Maximum number of scenarios executing at once.
    #[arg(long, value_name = "N")]
    parallelism: Option<usize>,

    /// Per-scenario generator timeout in seconds.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Fixture directory (overrides [fixtures] directory).
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,

    /// Template root (overrides [templates] root).
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Generator program (overrides [generator] program).
    #[arg(long, value_name = "PROGRAM")]
    generator: Option<PathBuf>,

    /// Argument passed to the generator program (repeatable).
    #[arg(
        long = "generator-arg",
        value_name = "ARG",
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    generator_args: Vec<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to FILE instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip template static validation.
    #[arg(long = "skip-templates", action = ArgAction::SetTrue)]
    skip_templates: bool,
}

#[derive(Debug, Args)]
pub struct TemplatesCommand {
    /// Module whose template validations should run.
    #[arg(long, value_name = "ID")]
    module: String,

    /// Fixture directory (overrides [fixtures] directory).
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,

    /// Template root (overrides [templates] root).
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to FILE instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(self, mut config: HarnessConfig) -> Result<u8> {
        self.apply_overrides(&mut config);
        config.validate().context("invalid harness configuration")?;

        let registry = Arc::new(load_registry(&config.fixtures.directory)?);
        let generator = CommandGenerator::from_config(&config.generator).ok_or_else(|| {
            anyhow!("no generator configured; pass --generator or set [generator] program")
        })?;
        let harness = Harness::new(
            registry,
            Arc::new(generator),
            Arc::new(FsTemplateStore::new(config.templates.root.clone())),
            HarnessOptions::from(&config.runner),
        );

        let (abort, signal) = abort_channel();
        let module = self.module.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let ctx = LogContext::new().with_module(&module);
                mth_warn!(context = ctx, "interrupt received; aborting run");
                abort.abort();
            }
        });

        let report = harness
            .run_module(&self.module, &self.scenarios, !self.skip_templates, signal)
            .await?;
        let ctx = LogContext::new().with_module(&self.module);
        mth_info!(context = ctx, "run finished with exit code {}", report.exit_code());
        render(&report, self.format, self.output.as_deref())?;
        Ok(report.exit_code())
    }

    fn apply_overrides(&self, config: &mut HarnessConfig) {
        if let Some(parallelism) = self.parallelism {
            config.runner.parallelism = parallelism;
        }
        if let Some(secs) = self.timeout_secs {
            config.runner.scenario_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.fixtures {
            config.fixtures.directory = dir.clone();
        }
        if let Some(dir) = &self.templates {
            config.templates.root = dir.clone();
        }
        if let Some(program) = &self.generator {
            config.generator.program = Some(program.clone());
            config.generator.args = self.generator_args.clone();
        } else if !self.generator_args.is_empty() {
            config.generator.args = self.generator_args.clone();
        }
    }
}

impl TemplatesCommand {
    pub fn execute(self, mut config: HarnessConfig) -> Result<u8> {
        if let Some(dir) = &self.fixtures {
            config.fixtures.directory = dir.clone();
        }
        if let Some(dir) = &self.templates {
            config.templates.root = dir.clone();
        }

        let registry = load_registry(&config.fixtures.directory)?;
        let module = registry
            .module(&self.module)
            .ok_or_else(|| anyhow!("unknown module '{}'", self.module))?;
        let store = FsTemplateStore::new(config.templates.root.clone());
        let report = Report::new(Utc::now(), Vec::new(), check_module_templates(module, &store));
        render(&report, self.format, self.output.as_deref())?;
        Ok(report.exit_code())
    }
}

fn render(report: &Report, format: OutputFormat, output: Option<&std::path::Path>) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => report.to_json().context("failed to serialise report")?,
    };
    emit(&rendered, output)
}
