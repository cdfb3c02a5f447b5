//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "05-reporting"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Scenario lifecycle driver and bounded worker pool."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mth_common::time::{elapsed_millis, monotonic_now};
use mth_common::RunnerConfig;
use mth_fixtures::{Registry, Scenario};
use mth_logging::{log_stage_event, mth_debug, mth_warn, LogContext, StageOutcome};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::content::check_contents;
use crate::failure::{Failure, ScenarioError, Stage};
use crate::files::check_files;
use crate::generator::{invoke_with_timeout, Generator};
use crate::report::{Report, ScenarioReport, TemplateReport};
use crate::resolver::resolve;
use crate::snapshot::Snapshot;
use crate::templates::{check_module_templates, TemplateStore};

/// Run-scoped knobs, normally derived from `[runner]` configuration.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub parallelism: usize,
    pub scenario_timeout: Duration,
    pub retain_failed_snapshots: Option<PathBuf>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

impl From<&RunnerConfig> for HarnessOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            parallelism: config.parallelism,
            scenario_timeout: config.scenario_timeout,
            retain_failed_snapshots: config.retain_failed_snapshots.clone(),
        }
    }
}

/// Errors preventing a run from starting at all.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("module '{module}' has no scenario named '{scenario}'")]
    UnknownScenario { module: String, scenario: String },
    #[error("harness task failed: {0}")]
    Internal(String),
}

/// Raises the run-wide abort signal.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Observes the run-wide abort signal.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal is raised. Never resolves if every handle is
    /// dropped without aborting.
    pub async fn aborted(&mut self) {
        let closed = self.receiver.wait_for(|raised| *raised).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

pub fn abort_channel() -> (AbortHandle, AbortSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        AbortHandle {
            sender: Arc::new(sender),
        },
        AbortSignal { receiver },
    )
}

/// Drives scenarios through resolution, generation and validation.
///
/// Cloning is cheap; the registry, generator and template store are shared.
#[derive(Clone)]
pub struct Harness {
    registry: Arc<Registry>,
    generator: Arc<dyn Generator>,
    templates: Arc<dyn TemplateStore>,
    options: HarnessOptions,
}

impl Harness {
    pub fn new(
        registry: Arc<Registry>,
        generator: Arc<dyn Generator>,
        templates: Arc<dyn TemplateStore>,
        options: HarnessOptions,
    ) -> Self {
        Self {
            registry,
            generator,
            templates,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    /// Pick scenarios of `module_id` by name, in the order given. An empty
    /// filter selects every scenario in declaration order.
    pub fn select(&self, module_id: &str, names: &[String]) -> Result<Vec<Scenario>, HarnessError> {
        let module = self
            .registry
            .module(module_id)
            .ok_or_else(|| HarnessError::UnknownModule(module_id.to_string()))?;
        if names.is_empty() {
            return Ok(module.scenarios.clone());
        }
        names
            .iter()
            .map(|name| {
                module
                    .scenario(name)
                    .cloned()
                    .ok_or_else(|| HarnessError::UnknownScenario {
                        module: module_id.to_string(),
                        scenario: name.clone(),
                    })
            })
            .collect()
    }

    /// Run every template validation of `module_id` against the store.
    pub fn check_templates(&self, module_id: &str) -> Result<Vec<TemplateReport>, HarnessError> {
        let module = self
            .registry
            .module(module_id)
            .ok_or_else(|| HarnessError::UnknownModule(module_id.to_string()))?;
        Ok(check_module_templates(module, self.templates.as_ref()))
    }

    /// Template validation followed by the selected scenarios of one module.
    pub async fn run_module(
        &self,
        module_id: &str,
        scenario_filter: &[String],
        include_templates: bool,
        abort: AbortSignal,
    ) -> Result<Report, HarnessError> {
        let started_at = Utc::now();
        let scenarios = self.select(module_id, scenario_filter)?;
        let templates = if include_templates {
            let harness = self.clone();
            let module_id = module_id.to_owned();
            tokio::task::spawn_blocking(move || harness.check_templates(&module_id))
                .await
                .map_err(|err| HarnessError::Internal(err.to_string()))??
        } else {
            Vec::new()
        };
        info!(
            module = module_id,
            scenarios = scenarios.len(),
            templates = templates.len(),
            parallelism = self.options.parallelism,
            "starting harness run"
        );
        let scenarios = self.run_scenarios(scenarios, abort).await;
        let report = Report::new(started_at, scenarios, templates);
        info!(module = module_id, summary = ?report.summary(), "harness run finished");
        Ok(report)
    }

    /// Run `scenarios` on the bounded worker pool.
    ///
    /// Reports come back in input order. Once `abort` is raised no further
    /// scenario starts; those left over are reported aborted at `Pending`.
    pub async fn run_scenarios(
        &self,
        scenarios: Vec<Scenario>,
        mut abort: AbortSignal,
    ) -> Vec<ScenarioReport> {
        let labels: Vec<(String, String)> = scenarios
            .iter()
            .map(|s| (s.module_id.clone(), s.name.clone()))
            .collect();
        let trackers: Vec<Arc<Mutex<Stage>>> = scenarios
            .iter()
            .map(|_| Arc::new(Mutex::new(Stage::Pending)))
            .collect();
        let mut slots: Vec<Option<ScenarioReport>> = scenarios.iter().map(|_| None).collect();
        let mut started = vec![false; scenarios.len()];

        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.max(1)));
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = abort.aborted() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                break;
            };
            if abort.is_aborted() {
                break;
            }
            started[index] = true;
            let harness = self.clone();
            let tracker = trackers[index].clone();
            let signal = abort.clone();
            tasks.spawn(async move {
                let report = harness.execute(scenario, tracker, signal).await;
                drop(permit);
                (index, report)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(err) => error!(error = %err, "scenario task failed"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let (module_id, name) = &labels[index];
                    let (stage, error) = if started[index] {
                        (
                            *trackers[index].lock(),
                            ScenarioError::Internal("scenario task terminated unexpectedly".into()),
                        )
                    } else {
                        (Stage::Pending, ScenarioError::Cancelled)
                    };
                    let ctx = LogContext::new()
                        .with_module(module_id)
                        .with_scenario(name)
                        .with_stage(stage.as_str());
                    log_stage_event(
                        Some(&ctx),
                        "scenario.aborted",
                        &error.to_string(),
                        StageOutcome::Fault,
                    );
                    ScenarioReport::aborted(
                        module_id.clone(),
                        name.clone(),
                        stage,
                        error,
                        Vec::new(),
                        0,
                    )
                })
            })
            .collect()
    }

    async fn execute(
        &self,
        scenario: Scenario,
        tracker: Arc<Mutex<Stage>>,
        mut abort: AbortSignal,
    ) -> ScenarioReport {
        let started = monotonic_now();
        let mut resolved = Vec::new();
        let outcome = self
            .run_stages(&scenario, &tracker, &mut abort, &mut resolved)
            .await;
        let elapsed_ms = elapsed_millis(started);

        match outcome {
            Ok((failures, snapshot)) => {
                set_stage(&tracker, &scenario, Stage::Completed);
                let ctx = LogContext::new()
                    .with_module(&scenario.module_id)
                    .with_scenario(&scenario.name);
                if failures.is_empty() {
                    log_stage_event(
                        Some(&ctx),
                        "scenario.completed",
                        "pass",
                        StageOutcome::Success,
                    );
                } else {
                    log_stage_event(
                        Some(&ctx),
                        "scenario.completed",
                        &format!("fail: {} failure(s)", failures.len()),
                        StageOutcome::Failed,
                    );
                    if let Some(dir) = &self.options.retain_failed_snapshots {
                        retain_snapshot(dir, &scenario, snapshot).await;
                    }
                }
                ScenarioReport::completed(
                    scenario.module_id,
                    scenario.name,
                    resolved,
                    failures,
                    elapsed_ms,
                )
            }
            Err(error) => {
                let stage = *tracker.lock();
                let ctx = LogContext::new()
                    .with_module(&scenario.module_id)
                    .with_scenario(&scenario.name)
                    .with_stage(stage.as_str());
                log_stage_event(
                    Some(&ctx),
                    "scenario.aborted",
                    &error.to_string(),
                    StageOutcome::Fault,
                );
                ScenarioReport::aborted(
                    scenario.module_id,
                    scenario.name,
                    stage,
                    error,
                    resolved,
                    elapsed_ms,
                )
            }
        }
    }

    async fn run_stages(
        &self,
        scenario: &Scenario,
        tracker: &Mutex<Stage>,
        abort: &mut AbortSignal,
        resolved: &mut Vec<String>,
    ) -> Result<(Vec<Failure>, Snapshot), ScenarioError> {
        set_stage(tracker, scenario, Stage::Resolving);
        cancel_point(abort)?;
        *resolved = resolve(scenario, &self.registry)?;

        set_stage(tracker, scenario, Stage::Generating);
        cancel_point(abort)?;
        let snapshot = tokio::select! {
            biased;
            _ = abort.aborted() => return Err(ScenarioError::Cancelled),
            result = invoke_with_timeout(
                self.generator.as_ref(),
                resolved.as_slice(),
                &scenario.config,
                self.options.scenario_timeout,
            ) => result?,
        };

        set_stage(tracker, scenario, Stage::ValidatingFiles);
        cancel_point(abort)?;
        let mut failures = check_files(&scenario.expected_files, &snapshot);

        set_stage(tracker, scenario, Stage::ValidatingContent);
        cancel_point(abort)?;
        failures.extend(check_contents(&scenario.file_content_checks, &snapshot));

        Ok((failures, snapshot))
    }
}

fn set_stage(tracker: &Mutex<Stage>, scenario: &Scenario, stage: Stage) {
    *tracker.lock() = stage;
    let ctx = LogContext::new()
        .with_module(&scenario.module_id)
        .with_scenario(&scenario.name)
        .with_stage(stage.as_str());
    mth_debug!(context = ctx, "stage entered");
}

fn cancel_point(abort: &AbortSignal) -> Result<(), ScenarioError> {
    if abort.is_aborted() {
        Err(ScenarioError::Cancelled)
    } else {
        Ok(())
    }
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn retain_snapshot(dir: &Path, scenario: &Scenario, snapshot: Snapshot) {
    let ctx = LogContext::new()
        .with_module(&scenario.module_id)
        .with_scenario(&scenario.name);
    if !is_single_segment(&scenario.module_id) || !is_single_segment(&scenario.name) {
        mth_warn!(context = ctx, "snapshot not retained: names must be single path segments");
        return;
    }
    let target = dir.join(&scenario.module_id).join(&scenario.name);
    let destination = target.clone();
    let written = tokio::task::spawn_blocking(move || snapshot.write_to(&destination))
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
        .and_then(|result| result);
    match written {
        Ok(()) => mth_debug!(context = ctx, "failed snapshot retained at {}", target.display()),
        Err(err) => {
            mth_warn!(context = ctx, "could not retain failed snapshot: {err}");
            warn!(path = %target.display(), "snapshot retention skipped");
        }
    }
}
