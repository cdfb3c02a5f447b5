//! ---
//! mth_section: "01-core-functionality"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Shared primitives and utilities for the harness runtime."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_fixtures_directory() -> PathBuf {
    PathBuf::from("fixtures")
}

fn default_templates_root() -> PathBuf {
    PathBuf::from("templates")
}

fn default_parallelism() -> usize {
    4
}

fn default_scenario_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for a harness run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`HarnessConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedHarnessConfig {
    pub config: HarnessConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl HarnessConfig {
    pub const ENV_CONFIG_PATH: &str = "MTH_CONFIG";

    /// Load configuration, respecting an explicit path, then `MTH_CONFIG`,
    /// then the first existing candidate. Falls back to defaults.
    pub fn load_with_source<P: AsRef<Path>>(
        explicit: Option<&Path>,
        candidates: &[P],
    ) -> Result<LoadedHarnessConfig> {
        if let Some(path) = explicit {
            let config = Self::from_path(path)?;
            return Ok(LoadedHarnessConfig {
                config,
                source: Some(path.to_path_buf()),
            });
        }

        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let candidate = candidate.as_ref();
            if candidate.exists() {
                let config = Self::from_path(candidate)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: Some(candidate.to_path_buf()),
                });
            }
        }

        debug!("no harness configuration file found; using defaults");
        Ok(LoadedHarnessConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading harness configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<HarnessConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.runner.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for HarnessConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: HarnessConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturesConfig {
    #[serde(default = "default_fixtures_directory")]
    pub directory: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            directory: default_fixtures_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_root")]
    pub root: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            root: default_templates_root(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Upper bound on concurrently executing scenarios.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Wall-clock bound on a single generator invocation.
    #[serde(default = "default_scenario_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub scenario_timeout: Duration,
    /// Directory receiving the snapshot of every failed scenario.
    #[serde(default)]
    pub retain_failed_snapshots: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            scenario_timeout: default_scenario_timeout(),
            retain_failed_snapshots: None,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(anyhow!("runner.parallelism must be at least 1"));
        }
        if self.scenario_timeout.is_zero() {
            return Err(anyhow!("runner.scenario_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// External generator process wiring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(program) = &self.program {
            if program.as_os_str().is_empty() {
                return Err(anyhow!("generator.program cannot be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Rolling log file directory; console-only logging when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: HarnessConfig = "".parse().expect("empty config parses");
        assert_eq!(config.runner.parallelism, 4);
        assert_eq!(config.runner.scenario_timeout, Duration::from_secs(120));
        assert_eq!(config.fixtures.directory, PathBuf::from("fixtures"));
        assert!(config.generator.program.is_none());
    }

    #[test]
    fn runner_and_generator_sections_parse() {
        let config: HarnessConfig = r#"
            [runner]
            parallelism = 8
            scenario_timeout = 30
            retain_failed_snapshots = "target/failed"

            [generator]
            program = "genesis3"
            args = ["generate", "--json"]

            [generator.env]
            GENESIS_PROFILE = "ci"

            [logging]
            format = "structured-json"
        "#
        .parse()
        .expect("config parses");
        assert_eq!(config.runner.parallelism, 8);
        assert_eq!(config.runner.scenario_timeout, Duration::from_secs(30));
        assert_eq!(
            config.runner.retain_failed_snapshots,
            Some(PathBuf::from("target/failed"))
        );
        assert_eq!(config.generator.args, vec!["generate", "--json"]);
        assert_eq!(config.generator.env["GENESIS_PROFILE"], "ci");
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = "[runner]\nparallelism = 0\n"
            .parse::<HarnessConfig>()
            .expect_err("zero parallelism must fail");
        assert!(err.to_string().contains("parallelism"));
    }

    #[test]
    fn explicit_path_wins_over_candidates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let explicit = dir.path().join("explicit.toml");
        let candidate = dir.path().join("mth.toml");
        fs::write(&explicit, "[runner]\nparallelism = 2\n").expect("write explicit");
        fs::write(&candidate, "[runner]\nparallelism = 6\n").expect("write candidate");

        let loaded =
            HarnessConfig::load_with_source(Some(explicit.as_path()), &[candidate.as_path()])
                .expect("load succeeds");
        assert_eq!(loaded.config.runner.parallelism, 2);
        assert_eq!(loaded.source.as_deref(), Some(explicit.as_path()));
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        let loaded =
            HarnessConfig::load_with_source(None, &[missing]).expect("defaults load");
        if std::env::var(HarnessConfig::ENV_CONFIG_PATH).is_err() {
            assert!(loaded.source.is_none());
            assert_eq!(loaded.config.runner.parallelism, 4);
        }
    }
}
