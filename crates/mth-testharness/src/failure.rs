//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "02-validation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Failure taxonomy shared by validators and the runner."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::generator::GenerationError;

/// Assertion-kind failures. These never stop evaluation; every one found in
/// a run is reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// An expected path is absent from the generated tree.
    MissingFile { path: String },
    /// A content check references a file that was not generated.
    FileNotFound { file: String },
    /// A required substring does not occur in the file or template.
    MissingSubstring { file: String, substring: String },
    /// A forbidden substring occurs in the file or template.
    ForbiddenSubstring { file: String, substring: String },
    /// A template source could not be located in the template store.
    TemplateNotFound { path: String },
}

impl Failure {
    /// Stable snake_case name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::MissingFile { .. } => "missing_file",
            Failure::FileNotFound { .. } => "file_not_found",
            Failure::MissingSubstring { .. } => "missing_substring",
            Failure::ForbiddenSubstring { .. } => "forbidden_substring",
            Failure::TemplateNotFound { .. } => "template_not_found",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::MissingFile { path } => write!(f, "MissingFile({path})"),
            Failure::FileNotFound { file } => write!(f, "FileNotFound({file})"),
            Failure::MissingSubstring { file, substring } => {
                write!(f, "MissingSubstring({file}, {substring:?})")
            }
            Failure::ForbiddenSubstring { file, substring } => {
                write!(f, "ForbiddenSubstring({file}, {substring:?})")
            }
            Failure::TemplateNotFound { path } => write!(f, "TemplateNotFound({path})"),
        }
    }
}

/// Fatal, stage-local errors. Any of these moves the affected scenario to
/// `Aborted` and skips its remaining stages.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("unknown dependency '{id}' required by '{required_by}'")]
    UnknownDependency { id: String, required_by: String },
    #[error("dependency cycle: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("cancelled")]
    Cancelled,
    #[error("internal harness error: {0}")]
    Internal(String),
}

impl ScenarioError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioError::Schema(_) => "schema_error",
            ScenarioError::UnknownDependency { .. } => "unknown_dependency",
            ScenarioError::DependencyCycle { .. } => "dependency_cycle",
            ScenarioError::Generation(_) => "generation_error",
            ScenarioError::Cancelled => "cancelled",
            ScenarioError::Internal(_) => "internal",
        }
    }
}

impl Serialize for ScenarioError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ScenarioError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Lifecycle stages a scenario moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Resolving,
    Generating,
    ValidatingFiles,
    ValidatingContent,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Resolving => "resolving",
            Stage::Generating => "generating",
            Stage::ValidatingFiles => "validating_files",
            Stage::ValidatingContent => "validating_content",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
