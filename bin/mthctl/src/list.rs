//! ---
//! mth_section: "06-command-surface"
//! mth_subsection: "binary"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Registry listing for the control CLI."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use mth_common::HarnessConfig;
use mth_fixtures::Module;
use serde::Serialize;

use crate::{emit, load_registry, OutputFormat};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only list this module.
    #[arg(long, value_name = "ID")]
    module: Option<String>,

    /// Fixture directory (overrides [fixtures] directory).
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,

    /// Listing format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleListing<'a> {
    id: &'a str,
    name: &'a str,
    dependencies: Vec<&'a str>,
    scenarios: Vec<ScenarioListing<'a>>,
    template_validations: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioListing<'a> {
    name: &'a str,
    description: &'a str,
    dependencies: Vec<&'a str>,
    expected_files: usize,
    content_checks: usize,
}

impl<'a> From<&'a Module> for ModuleListing<'a> {
    fn from(module: &'a Module) -> Self {
        Self {
            id: &module.id,
            name: &module.name,
            dependencies: module.dependencies.iter().map(String::as_str).collect(),
            scenarios: module
                .scenarios
                .iter()
                .map(|scenario| ScenarioListing {
                    name: &scenario.name,
                    description: &scenario.description,
                    dependencies: scenario.dependencies.iter().map(String::as_str).collect(),
                    expected_files: scenario.expected_files.len(),
                    content_checks: scenario.file_content_checks.len(),
                })
                .collect(),
            template_validations: module
                .template_validations
                .iter()
                .map(|validation| validation.name.as_str())
                .collect(),
        }
    }
}

impl ListCommand {
    pub fn execute(self, mut config: HarnessConfig) -> Result<u8> {
        if let Some(dir) = &self.fixtures {
            config.fixtures.directory = dir.clone();
        }
        let registry = load_registry(&config.fixtures.directory)?;
        let listings: Vec<ModuleListing<'_>> = match &self.module {
            Some(id) => {
                let module = registry
                    .module(id)
                    .ok_or_else(|| anyhow!("unknown module '{id}'"))?;
                vec![ModuleListing::from(module)]
            }
            None => registry.modules().map(ModuleListing::from).collect(),
        };

        let rendered = match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&listings).context("failed to serialise listing")?
            }
            OutputFormat::Text => render_text(&listings),
        };
        emit(&rendered, None)?;
        Ok(mth_testharness::EXIT_PASS)
    }
}

fn render_text(listings: &[ModuleListing<'_>]) -> String {
    let mut out = String::new();
    for module in listings {
        let _ = writeln!(out, "{} ({})", module.id, module.name);
        if !module.dependencies.is_empty() {
            let _ = writeln!(out, "  requires: {}", module.dependencies.join(", "));
        }
        for scenario in &module.scenarios {
            let _ = writeln!(
                out,
                "  scenario {}: {} file(s), {} content check(s)",
                scenario.name, scenario.expected_files, scenario.content_checks
            );
            if !scenario.dependencies.is_empty() {
                let _ = writeln!(out, "    depends on: {}", scenario.dependencies.join(", "));
            }
        }
        for name in &module.template_validations {
            let _ = writeln!(out, "  template {name}");
        }
    }
    out.trim_end().to_string()
}
