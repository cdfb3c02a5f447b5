//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "01-bootstrap"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Test harness orchestrator and shared exports."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
//! The test harness crate coordinates scenario orchestration and
//! validation.
//!
//! A run resolves each scenario's module dependencies, invokes the external
//! generator, checks the produced file tree and file contents, lints raw
//! template sources, and aggregates everything into a [`Report`].
//! Validation failures are always collected exhaustively; only stage-local
//! fatal errors abort a scenario, and never its siblings.

pub mod content;
pub mod failure;
pub mod files;
pub mod generator;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod snapshot;
pub mod templates;

pub use content::{check_contents, evaluate_substrings};
pub use failure::{Failure, ScenarioError, Stage};
pub use files::check_files;
pub use generator::{
    invoke_with_timeout, CommandGenerator, GenerationError, Generator, Invocation, StaticGenerator,
};
pub use report::{
    Report, ScenarioReport, ScenarioState, Summary, TemplateReport, Verdict, EXIT_FAILURES,
    EXIT_HARNESS_ERROR, EXIT_PASS,
};
pub use resolver::resolve;
pub use runner::{abort_channel, AbortHandle, AbortSignal, Harness, HarnessError, HarnessOptions};
pub use snapshot::Snapshot;
pub use templates::{
    check_module_templates, check_template, FsTemplateStore, InMemoryTemplateStore, TemplateStore,
    TemplateStoreError,
};
