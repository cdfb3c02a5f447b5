//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "03-generation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Generator invocation contract and adapters."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use mth_common::GeneratorConfig;
use mth_fixtures::ScenarioConfig;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::snapshot::Snapshot;

pub const ENV_OUTPUT_DIR: &str = "MTH_OUTPUT_DIR";
pub const ENV_MODULES: &str = "MTH_MODULES";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("failed to spawn generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("generator exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("generator protocol error: {0}")]
    Protocol(String),
    #[error("generator reported failure: {0}")]
    Failed(String),
}

impl GenerationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GenerationError::Timeout { .. })
    }

    fn io(context: impl Into<String>, source: io::Error) -> Self {
        GenerationError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Code generator boundary. Implementations turn an activated module list
/// and an opaque config into a file tree.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(
        &self,
        modules: &[String],
        config: &ScenarioConfig,
    ) -> Result<Snapshot, GenerationError>;
}

/// Run `generator` bounded by `timeout`. The in-flight invocation future is
/// dropped on expiry.
pub async fn invoke_with_timeout(
    generator: &dyn Generator,
    modules: &[String],
    config: &ScenarioConfig,
    timeout: Duration,
) -> Result<Snapshot, GenerationError> {
    match tokio::time::timeout(timeout, generator.invoke(modules, config)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout { after: timeout }),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationRequest<'a> {
    modules: &'a [String],
    config: &'a ScenarioConfig,
    output_dir: &'a Path,
}

/// Drives an external generator program.
///
/// The request is written as JSON to the child's stdin and the child writes
/// its output below the directory named by `MTH_OUTPUT_DIR`. A zero exit
/// status is required. The child is killed if the invocation is dropped.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: IndexMap<String, String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: IndexMap::new(),
        }
    }

    /// Build from configuration; `None` when no program is configured.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        let program = config.program.clone()?;
        Some(Self {
            program,
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            env: config.env.clone(),
        })
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn invoke(
        &self,
        modules: &[String],
        config: &ScenarioConfig,
    ) -> Result<Snapshot, GenerationError> {
        let output_dir = tempfile::Builder::new()
            .prefix("mth-gen-")
            .tempdir()
            .map_err(|source| GenerationError::io("failed to create output directory", source))?;

        let request = GenerationRequest {
            modules,
            config,
            output_dir: output_dir.path(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|err| GenerationError::Protocol(err.to_string()))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .env(ENV_OUTPUT_DIR, output_dir.path())
            .env(ENV_MODULES, modules.join(","))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(
            program = %self.program.display(),
            module = %config.module_id,
            modules = ?modules,
            "spawning generator"
        );
        let mut child = command.spawn().map_err(|source| GenerationError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // Generators are free to ignore the request body.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => {
                    return Err(GenerationError::io("failed to write generator request", source))
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| GenerationError::io("failed to wait for generator", source))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                program = %self.program.display(),
                status = %output.status,
                "generator exited unsuccessfully"
            );
            return Err(GenerationError::Exited {
                status: output.status.to_string(),
                stderr,
            });
        }

        let snapshot = tokio::task::spawn_blocking(move || {
            let collected = Snapshot::from_dir(output_dir.path());
            drop(output_dir);
            collected
        })
        .await
        .map_err(|err| GenerationError::Protocol(format!("snapshot collection panicked: {err}")))?
        .map_err(|source| GenerationError::io("failed to collect generated files", source))?;
        debug!(files = snapshot.len(), "generator output collected");
        Ok(snapshot)
    }
}

/// A single recorded call against a [`StaticGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub modules: Vec<String>,
    pub config_module_id: String,
}

#[derive(Debug, Clone)]
struct StaticEntry {
    outcome: Result<Snapshot, String>,
    delay: Option<Duration>,
}

/// In-memory generator returning preconfigured snapshots keyed by the
/// config `moduleId`. Every call is recorded.
#[derive(Debug, Default)]
pub struct StaticGenerator {
    entries: IndexMap<String, StaticEntry>,
    invocations: Mutex<Vec<Invocation>>,
}

impl StaticGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, config_module_id: impl Into<String>, snapshot: Snapshot) -> Self {
        let entry = self.entry(config_module_id.into());
        entry.outcome = Ok(snapshot);
        self
    }

    pub fn with_failure(
        mut self,
        config_module_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let entry = self.entry(config_module_id.into());
        entry.outcome = Err(message.into());
        self
    }

    /// Delay the response for `config_module_id` by `delay`.
    pub fn with_delay(mut self, config_module_id: impl Into<String>, delay: Duration) -> Self {
        let entry = self.entry(config_module_id.into());
        entry.delay = Some(delay);
        self
    }

    fn entry(&mut self, key: String) -> &mut StaticEntry {
        self.entries.entry(key).or_insert_with(|| StaticEntry {
            outcome: Ok(Snapshot::default()),
            delay: None,
        })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    async fn invoke(
        &self,
        modules: &[String],
        config: &ScenarioConfig,
    ) -> Result<Snapshot, GenerationError> {
        self.invocations.lock().push(Invocation {
            modules: modules.to_vec(),
            config_module_id: config.module_id.clone(),
        });
        let entry = self.entries.get(&config.module_id).ok_or_else(|| {
            GenerationError::Protocol(format!(
                "no snapshot configured for '{}'",
                config.module_id
            ))
        })?;
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        entry.outcome.clone().map_err(GenerationError::Failed)
    }
}
