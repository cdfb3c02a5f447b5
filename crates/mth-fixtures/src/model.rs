//! ---
//! mth_section: "02-fixture-data-model"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Fixture schema definitions, validation and the module registry."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generator extension unit owning scenarios and template validations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Registry-wide unique identifier (e.g. `extension-stripe`).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Modules that must be activated whenever this module is.
    pub dependencies: IndexSet<String>,
    /// Scenarios in fixture declaration order.
    pub scenarios: Vec<Scenario>,
    /// Static template validations in fixture declaration order.
    pub template_validations: Vec<TemplateValidation>,
}

impl Module {
    /// Look up a scenario by name.
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }
}

/// One named test case pairing a generator config with expected output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Identifier of the module that owns this scenario.
    pub module_id: String,
    /// Name, unique within the owning module.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Dependency module ids in declaration order.
    pub dependencies: IndexSet<String>,
    /// Generator configuration, passed through verbatim.
    pub config: ScenarioConfig,
    /// Relative paths that must be present in the generated tree.
    pub expected_files: IndexSet<String>,
    /// Substring assertions against generated file contents.
    pub file_content_checks: Vec<FileContentCheck>,
}

/// Generator configuration for a scenario.
///
/// The harness never interprets or mutates these values; they are handed to
/// the generator exactly as declared, including keys it does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    /// Generator-side module id (distinct from the registry module id).
    pub module_id: String,
    /// Module kind, e.g. `extension`.
    pub kind: String,
    /// Module type, e.g. `stripe`.
    #[serde(rename = "type")]
    pub module_type: String,
    /// Provider tags such as `spring`, `react` or `drf`.
    pub providers: Vec<String>,
    /// Whether the module is enabled for this generation.
    pub enabled: bool,
    /// Free-form field values.
    #[serde(default)]
    pub field_values: Map<String, Value>,
    /// Unrecognised keys, preserved for the generator.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Required and forbidden substrings for one generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentCheck {
    /// Relative path of the generated file.
    pub file: String,
    /// Substrings that must appear.
    pub contains: IndexSet<String>,
    /// Substrings that must not appear.
    pub not_contains: IndexSet<String>,
}

/// Substring policy applied to a raw, unrendered template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateValidation {
    /// Name, unique within the owning module.
    pub name: String,
    /// Template source path relative to the template store root.
    pub template: String,
    /// Substrings that must appear.
    pub contains: IndexSet<String>,
    /// Substrings that must not appear.
    pub not_contains: IndexSet<String>,
    /// Why the policy exists; diagnostics only.
    pub reason: String,
}
