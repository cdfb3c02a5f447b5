//! ---
//! mth_section: "03-reporting-logging"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Structured logging adapters for scenario lifecycle events."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Module identifier the event belongs to.
    pub module: Option<&'a str>,
    /// Scenario or template validation name.
    pub scenario: Option<&'a str>,
    /// Lifecycle stage the scenario was in when the event fired.
    pub stage: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a module identifier.
    pub fn with_module(mut self, module: &'a str) -> Self {
        self.module = Some(module);
        self
    }

    /// Attach a scenario name.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Attach a lifecycle stage.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage or scenario completed without failures.
    Success,
    /// Assertions failed but the scenario ran to completion.
    Failed,
    /// The scenario was aborted.
    Fault,
}

impl StageOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Success => "success",
            StageOutcome::Failed => "failed",
            StageOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            StageOutcome::Success => Level::INFO,
            StageOutcome::Failed => Level::WARN,
            StageOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_stage_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: StageOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let module = ctx.module.unwrap_or("");
    let scenario = ctx.scenario.unwrap_or("");
    let stage = ctx.stage.unwrap_or("");
    let outcome_str = outcome.as_str();
    // `tracing::event!` needs a constant level.
    match outcome.level() {
        Level::ERROR => tracing::event!(Level::ERROR, event, outcome = outcome_str, module, scenario, stage, message = %message),
        Level::WARN => tracing::event!(Level::WARN, event, outcome = outcome_str, module, scenario, stage, message = %message),
        _ => tracing::event!(Level::INFO, event, outcome = outcome_str, module, scenario, stage, message = %message),
    }
}
