//! ---
//! mth_section: "02-fixture-data-model"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Fixture schema definitions, validation and the module registry."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexSet;
use serde::Deserialize;

use crate::error::{SchemaError, SchemaResult};
use crate::model::{FileContentCheck, Module, Scenario, ScenarioConfig, TemplateValidation};

/// Serialization formats accepted for fixture documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl FixtureFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Undecorated fixture document as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawModule {
    /// Module identifier.
    pub module_id: String,
    /// Display name.
    pub module_name: String,
    /// Module-level prerequisites.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Scenario definitions.
    pub scenarios: Vec<RawScenario>,
    /// Template validation definitions.
    pub template_validations: Vec<RawTemplateValidation>,
}

/// Undecorated scenario definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawScenario {
    /// Scenario name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Dependency module ids.
    pub dependencies: Vec<String>,
    /// Generator configuration.
    pub config: ScenarioConfig,
    /// Expected generated paths.
    pub expected_files: Vec<String>,
    /// Content assertions.
    pub file_content_checks: Vec<RawFileContentCheck>,
}

/// Undecorated content assertion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawFileContentCheck {
    /// Generated file path.
    pub file: String,
    /// Required substrings.
    pub contains: Vec<String>,
    /// Forbidden substrings.
    #[serde(default)]
    pub not_contains: Vec<String>,
}

/// Undecorated template validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawTemplateValidation {
    /// Validation name.
    pub name: String,
    /// Template source path.
    pub template: String,
    /// Required substrings.
    pub contains: Vec<String>,
    /// Forbidden substrings.
    #[serde(default)]
    pub not_contains: Vec<String>,
    /// Diagnostic reason.
    pub reason: String,
}

/// Decode a fixture document and validate it into a [`Module`].
///
/// `source_name` only labels error messages.
pub fn parse_module(text: &str, format: FixtureFormat, source_name: &str) -> SchemaResult<Module> {
    let raw: RawModule = match format {
        FixtureFormat::Json => {
            let mut de = serde_json::Deserializer::from_str(text);
            serde_path_to_error::deserialize(&mut de)
                .map_err(|err| malformed(source_name, err.path().to_string(), err.inner()))?
        }
        FixtureFormat::Yaml => {
            let de = serde_yaml::Deserializer::from_str(text);
            serde_path_to_error::deserialize(de)
                .map_err(|err| malformed(source_name, err.path().to_string(), err.inner()))?
        }
        FixtureFormat::Toml => {
            let de = toml::Deserializer::new(text);
            serde_path_to_error::deserialize(de)
                .map_err(|err| malformed(source_name, err.path().to_string(), err.inner()))?
        }
    };
    load(raw)
}

fn malformed(source_name: &str, field: String, err: &dyn std::fmt::Display) -> SchemaError {
    SchemaError::Malformed {
        source_name: source_name.to_owned(),
        field,
        message: err.to_string(),
    }
}

/// Validate a decoded document into an immutable [`Module`].
///
/// Pure and idempotent: the same input always yields the same module or the
/// same error.
pub fn load(raw: RawModule) -> SchemaResult<Module> {
    let module_id = raw.module_id.trim().to_owned();
    require_non_empty(&module_id, &module_id, "moduleId")?;
    check_segment(&module_id, "moduleId", &module_id)?;
    require_non_empty(&module_id, &raw.module_name, "moduleName")?;

    let dependencies = collect_ids(&module_id, "dependencies", raw.dependencies)?;

    let mut seen = HashSet::new();
    let mut scenarios = Vec::with_capacity(raw.scenarios.len());
    for (index, scenario) in raw.scenarios.into_iter().enumerate() {
        let scenario = load_scenario(&module_id, index, scenario)?;
        if !seen.insert(scenario.name.clone()) {
            return Err(SchemaError::DuplicateScenario {
                module: module_id,
                scenario: scenario.name,
            });
        }
        scenarios.push(scenario);
    }

    let mut seen = HashSet::new();
    let mut template_validations = Vec::with_capacity(raw.template_validations.len());
    for (index, validation) in raw.template_validations.into_iter().enumerate() {
        let field = format!("templateValidations[{index}]");
        require_non_empty(&module_id, &validation.name, &format!("{field}.name"))?;
        check_relative(&module_id, &format!("{field}.template"), &validation.template)?;
        if !seen.insert(validation.name.clone()) {
            return Err(SchemaError::DuplicateTemplateValidation {
                module: module_id,
                name: validation.name,
            });
        }
        template_validations.push(TemplateValidation {
            name: validation.name,
            template: validation.template,
            contains: collect_substrings(&module_id, &format!("{field}.contains"), validation.contains)?,
            not_contains: collect_substrings(
                &module_id,
                &format!("{field}.notContains"),
                validation.not_contains,
            )?,
            reason: validation.reason,
        });
    }

    Ok(Module {
        id: module_id,
        name: raw.module_name,
        dependencies,
        scenarios,
        template_validations,
    })
}

fn load_scenario(module_id: &str, index: usize, raw: RawScenario) -> SchemaResult<Scenario> {
    let field = format!("scenarios[{index}]");
    require_non_empty(module_id, &raw.name, &format!("{field}.name"))?;
    check_segment(module_id, &format!("{field}.name"), &raw.name)?;
    require_non_empty(module_id, &raw.config.module_id, &format!("{field}.config.moduleId"))?;

    let dependencies = collect_ids(module_id, &format!("{field}.dependencies"), raw.dependencies)?;

    let mut expected_files = IndexSet::with_capacity(raw.expected_files.len());
    for path in raw.expected_files {
        check_relative(module_id, &format!("{field}.expectedFiles"), &path)?;
        expected_files.insert(path);
    }

    let mut file_content_checks = Vec::with_capacity(raw.file_content_checks.len());
    for (check_index, check) in raw.file_content_checks.into_iter().enumerate() {
        let check_field = format!("{field}.fileContentChecks[{check_index}]");
        check_relative(module_id, &format!("{check_field}.file"), &check.file)?;
        file_content_checks.push(FileContentCheck {
            file: check.file,
            contains: collect_substrings(module_id, &format!("{check_field}.contains"), check.contains)?,
            not_contains: collect_substrings(
                module_id,
                &format!("{check_field}.notContains"),
                check.not_contains,
            )?,
        });
    }

    Ok(Scenario {
        module_id: module_id.to_owned(),
        name: raw.name,
        description: raw.description,
        dependencies,
        config: raw.config,
        expected_files,
        file_content_checks,
    })
}

fn require_non_empty(module_id: &str, value: &str, field: &str) -> SchemaResult<()> {
    if value.trim().is_empty() {
        return Err(SchemaError::EmptyField {
            module: module_id.to_owned(),
            field: field.to_owned(),
        });
    }
    Ok(())
}

fn collect_ids(module_id: &str, field: &str, ids: Vec<String>) -> SchemaResult<IndexSet<String>> {
    let mut collected = IndexSet::with_capacity(ids.len());
    for id in ids {
        require_non_empty(module_id, &id, field)?;
        collected.insert(id.trim().to_owned());
    }
    Ok(collected)
}

// An empty needle would match every file, so it is rejected.
fn collect_substrings(
    module_id: &str,
    field: &str,
    values: Vec<String>,
) -> SchemaResult<IndexSet<String>> {
    let mut collected = IndexSet::with_capacity(values.len());
    for value in values {
        if value.is_empty() {
            return Err(SchemaError::EmptyField {
                module: module_id.to_owned(),
                field: field.to_owned(),
            });
        }
        collected.insert(value);
    }
    Ok(collected)
}

fn check_relative(module_id: &str, field: &str, path: &str) -> SchemaResult<()> {
    let reason = if path.trim().is_empty() {
        Some("path is empty")
    } else if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        Some("path must be relative")
    } else if path.split(['/', '\\']).any(|segment| segment == "..") {
        Some("path must not contain `..` segments")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SchemaError::InvalidPath {
            module: module_id.to_owned(),
            field: field.to_owned(),
            path: path.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

// Module ids and scenario names become directory names for retained snapshots.
fn check_segment(module_id: &str, field: &str, value: &str) -> SchemaResult<()> {
    if value.contains(['/', '\\']) || value == "." || value == ".." || has_drive_prefix(value) {
        return Err(SchemaError::InvalidPath {
            module: module_id.to_owned(),
            field: field.to_owned(),
            path: value.to_owned(),
            reason: "must be a single path segment",
        });
    }
    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "moduleId": "extension-stripe",
        "moduleName": "Stripe Payments",
        "scenarios": [
            {
                "name": "stripe-react-checkout",
                "description": "React frontend with Stripe checkout components",
                "dependencies": [],
                "config": {
                    "moduleId": "stripe-react",
                    "kind": "extension",
                    "type": "stripe",
                    "providers": ["react"],
                    "enabled": true,
                    "fieldValues": { "enableSubscriptions": true }
                },
                "expectedFiles": [
                    "frontend/src/hooks/useStripe.ts",
                    "frontend/.env",
                    "frontend/src/hooks/useStripe.ts"
                ],
                "fileContentChecks": [
                    { "file": "frontend/.env", "contains": ["VITE_STRIPE_PUBLISHABLE_KEY"] }
                ]
            }
        ],
        "templateValidations": [
            {
                "name": "frontend-uses-publishable-key",
                "template": "extension-stripe/code-react/src/hooks/useStripe.ts.mustache",
                "contains": ["VITE_STRIPE_PUBLISHABLE_KEY"],
                "notContains": ["STRIPE_API_KEY", "sk_"],
                "reason": "Security: Frontend must never access secret API key"
            }
        ]
    }"#;

    #[test]
    fn json_fixture_loads_and_deduplicates_paths() {
        let module = parse_module(MINIMAL, FixtureFormat::Json, "stripe.json").expect("loads");
        assert_eq!(module.id, "extension-stripe");
        let scenario = module.scenario("stripe-react-checkout").expect("scenario");
        assert_eq!(scenario.module_id, "extension-stripe");
        assert_eq!(scenario.expected_files.len(), 2);
        assert_eq!(
            scenario.expected_files.get_index(0).map(String::as_str),
            Some("frontend/src/hooks/useStripe.ts")
        );
        assert_eq!(scenario.config.module_type, "stripe");
        assert!(scenario.file_content_checks[0].not_contains.is_empty());
        let validation = &module.template_validations[0];
        assert!(validation.not_contains.contains("sk_"));
    }

    #[test]
    fn loading_is_idempotent() {
        let first = parse_module(MINIMAL, FixtureFormat::Json, "a").expect("first");
        let second = parse_module(MINIMAL, FixtureFormat::Json, "a").expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn config_passes_through_unknown_keys() {
        let text = MINIMAL.replace(
            "\"enabled\": true,",
            "\"enabled\": true, \"packageName\": \"com.example\",",
        );
        let module = parse_module(&text, FixtureFormat::Json, "a").expect("loads");
        let config = &module.scenarios[0].config;
        assert_eq!(config.extra["packageName"], "com.example");
        let echoed = serde_json::to_value(config).expect("serialises");
        assert_eq!(echoed["packageName"], "com.example");
        assert_eq!(echoed["fieldValues"]["enableSubscriptions"], true);
        assert_eq!(echoed["type"], "stripe");
    }

    #[test]
    fn missing_required_field_is_a_schema_error() {
        let text = MINIMAL.replace("\"moduleName\": \"Stripe Payments\",", "");
        let err = parse_module(&text, FixtureFormat::Json, "stripe.json").expect_err("must fail");
        match err {
            SchemaError::Malformed { message, .. } => assert!(message.contains("moduleName")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scenario_without_expected_files_is_malformed() {
        let mut module: serde_json::Value = serde_json::from_str(MINIMAL).expect("json");
        module["scenarios"][0]
            .as_object_mut()
            .expect("object")
            .remove("expectedFiles");
        let err = parse_module(&module.to_string(), FixtureFormat::Json, "stripe.json")
            .expect_err("must fail");
        match err {
            SchemaError::Malformed { message, .. } => {
                assert!(message.contains("expectedFiles"), "message was {message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scenario_lists_are_required() {
        for key in ["description", "dependencies", "fileContentChecks"] {
            let mut module: serde_json::Value = serde_json::from_str(MINIMAL).expect("json");
            module["scenarios"][0].as_object_mut().expect("object").remove(key);
            let err = parse_module(&module.to_string(), FixtureFormat::Json, "a")
                .expect_err("must fail");
            assert!(matches!(err, SchemaError::Malformed { .. }), "{key}: {err}");
        }
        for key in ["scenarios", "templateValidations"] {
            let mut module: serde_json::Value = serde_json::from_str(MINIMAL).expect("json");
            module.as_object_mut().expect("object").remove(key);
            let err = parse_module(&module.to_string(), FixtureFormat::Json, "a")
                .expect_err("must fail");
            assert!(matches!(err, SchemaError::Malformed { .. }), "{key}: {err}");
        }
    }

    #[test]
    fn module_level_dependencies_and_not_contains_are_optional() {
        let module = parse_module(MINIMAL, FixtureFormat::Json, "a").expect("loads");
        assert!(module.dependencies.is_empty());
        assert!(module.scenarios[0].file_content_checks[0].not_contains.is_empty());
    }

    #[test]
    fn scenario_names_must_be_single_segments() {
        for name in ["../../escaped", "nested/name", "back\\slash", ".."] {
            let text = MINIMAL.replace(
                "\"name\": \"stripe-react-checkout\"",
                &format!("\"name\": {}", serde_json::Value::from(name)),
            );
            let err = parse_module(&text, FixtureFormat::Json, "a").expect_err("must fail");
            assert!(
                matches!(err, SchemaError::InvalidPath { ref field, .. } if field == "scenarios[0].name"),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn module_ids_must_be_single_segments() {
        let text = MINIMAL.replace("\"extension-stripe\"", "\"../extension-stripe\"");
        let err = parse_module(&text, FixtureFormat::Json, "a").expect_err("must fail");
        assert!(matches!(err, SchemaError::InvalidPath { ref field, .. } if field == "moduleId"));
    }

    #[test]
    fn non_list_where_list_required_reports_field_path() {
        let text = MINIMAL.replace(
            "\"providers\": [\"react\"]",
            "\"providers\": \"react\"",
        );
        let err = parse_module(&text, FixtureFormat::Json, "stripe.json").expect_err("must fail");
        match err {
            SchemaError::Malformed { field, .. } => {
                assert!(field.starts_with("scenarios[0].config"), "field was {field}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_scenario_names_are_rejected() {
        let module: serde_json::Value = serde_json::from_str(MINIMAL).expect("json");
        let mut doubled = module.clone();
        let scenario = module["scenarios"][0].clone();
        doubled["scenarios"]
            .as_array_mut()
            .expect("array")
            .push(scenario);
        let err = parse_module(&doubled.to_string(), FixtureFormat::Json, "a")
            .expect_err("duplicate must fail");
        assert!(matches!(err, SchemaError::DuplicateScenario { ref scenario, .. } if scenario == "stripe-react-checkout"));
    }

    #[test]
    fn absolute_expected_paths_are_rejected() {
        let text = MINIMAL.replace("\"frontend/.env\",", "\"/etc/passwd\",");
        let err = parse_module(&text, FixtureFormat::Json, "a").expect_err("must fail");
        assert!(matches!(err, SchemaError::InvalidPath { .. }));
    }

    #[test]
    fn unknown_check_keys_are_rejected() {
        let text = MINIMAL.replace("\"contains\": [\"VITE_STRIPE_PUBLISHABLE_KEY\"] }", "\"contain\": [\"x\"] }");
        assert!(parse_module(&text, FixtureFormat::Json, "a").is_err());
    }

    #[test]
    fn yaml_and_toml_fixtures_load() {
        let yaml = r#"
moduleId: extension-rdbms
moduleName: Relational Database
scenarios:
  - name: rdbms-postgres
    description: PostgreSQL datasource
    dependencies: []
    config:
      moduleId: rdbms
      kind: extension
      type: rdbms
      providers: [spring]
      enabled: true
    expectedFiles: [backend/src/main/resources/application-db.yaml]
    fileContentChecks: []
templateValidations: []
"#;
        let module = parse_module(yaml, FixtureFormat::Yaml, "rdbms.yaml").expect("yaml loads");
        assert_eq!(module.scenarios[0].expected_files.len(), 1);

        let toml_text = r#"
moduleId = "extension-rdbms"
moduleName = "Relational Database"
scenarios = []

[[templateValidations]]
name = "uses-liquibase"
template = "extension-rdbms/code-spring/changelog.yaml.mustache"
contains = ["databaseChangeLog"]
reason = "Migrations are managed by Liquibase"
"#;
        let module = parse_module(toml_text, FixtureFormat::Toml, "rdbms.toml").expect("toml loads");
        assert_eq!(module.template_validations[0].name, "uses-liquibase");
    }

    #[test]
    fn format_is_inferred_from_extension() {
        assert_eq!(FixtureFormat::from_path(Path::new("a/b.yml")), Some(FixtureFormat::Yaml));
        assert_eq!(FixtureFormat::from_path(Path::new("a/b.json")), Some(FixtureFormat::Json));
        assert_eq!(FixtureFormat::from_path(Path::new("a/b.js")), None);
    }
}
