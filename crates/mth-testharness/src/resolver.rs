//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "02-resolution"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Topological module dependency resolution."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use indexmap::IndexSet;
use mth_fixtures::{Registry, Scenario};
use tracing::debug;

use crate::failure::ScenarioError;

struct Frame<'a> {
    id: &'a str,
    children: Vec<&'a str>,
    next: usize,
}

/// Resolve the ordered module activation list for `scenario`.
///
/// Dependencies come before the modules that require them and the
/// scenario's own module is always last. Independent siblings keep their
/// declaration order; a module reachable along several paths appears once.
/// The walk keeps an explicit stack so arbitrarily deep chains and cycles
/// never recurse.
pub fn resolve(scenario: &Scenario, registry: &Registry) -> Result<Vec<String>, ScenarioError> {
    let owner = registry.module(&scenario.module_id).ok_or_else(|| {
        ScenarioError::Schema(format!(
            "scenario '{}' belongs to unregistered module '{}'",
            scenario.name, scenario.module_id
        ))
    })?;

    let root_children: Vec<&str> = scenario
        .dependencies
        .iter()
        .chain(owner.dependencies.iter())
        .map(String::as_str)
        .collect();

    let mut order: IndexSet<&str> = IndexSet::new();
    let mut on_path: IndexSet<&str> = IndexSet::new();
    on_path.insert(owner.id.as_str());
    let mut stack = vec![Frame {
        id: owner.id.as_str(),
        children: root_children,
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(&child) = frame.children.get(frame.next) else {
            let id = frame.id;
            stack.pop();
            on_path.shift_remove(id);
            order.insert(id);
            continue;
        };
        frame.next += 1;
        let parent = frame.id;

        if order.contains(child) {
            continue;
        }
        if let Some(position) = on_path.get_index_of(child) {
            let mut cycle: Vec<String> = on_path
                .iter()
                .skip(position)
                .map(|id| (*id).to_string())
                .collect();
            cycle.push(child.to_string());
            return Err(ScenarioError::DependencyCycle { cycle });
        }
        let module = registry
            .module(child)
            .ok_or_else(|| ScenarioError::UnknownDependency {
                id: child.to_string(),
                required_by: parent.to_string(),
            })?;
        on_path.insert(child);
        stack.push(Frame {
            id: child,
            children: module.dependencies.iter().map(String::as_str).collect(),
            next: 0,
        });
    }

    let resolved: Vec<String> = order.into_iter().map(str::to_string).collect();
    debug!(
        module = %scenario.module_id,
        scenario = %scenario.name,
        resolved = ?resolved,
        "dependencies resolved"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use mth_fixtures::{Module, ScenarioConfig};
    use serde_json::Map;

    fn config(id: &str) -> ScenarioConfig {
        ScenarioConfig {
            module_id: id.into(),
            kind: "extension".into(),
            module_type: id.into(),
            providers: vec!["spring".into()],
            enabled: true,
            field_values: Map::new(),
            extra: Map::new(),
        }
    }

    fn module(id: &str, deps: &[&str], scenario_deps: &[&str]) -> Module {
        Module {
            id: id.into(),
            name: id.into(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            scenarios: vec![Scenario {
                module_id: id.into(),
                name: "default".into(),
                description: String::new(),
                dependencies: scenario_deps.iter().map(|d| d.to_string()).collect(),
                config: config(id),
                expected_files: IndexSet::new(),
                file_content_checks: Vec::new(),
            }],
            template_validations: Vec::new(),
        }
    }

    fn registry(modules: Vec<Module>) -> Registry {
        Registry::from_modules(modules).expect("registry builds")
    }

    fn scenario<'a>(registry: &'a Registry, id: &str) -> &'a Scenario {
        registry.scenario(id, "default").expect("scenario present")
    }

    #[test]
    fn depth_one_dependency_precedes_owner() {
        let registry = registry(vec![
            module("extension-stripe", &[], &["extension-rdbms"]),
            module("extension-rdbms", &[], &[]),
        ]);
        let resolved = resolve(scenario(&registry, "extension-stripe"), &registry).expect("resolves");
        assert_eq!(resolved, vec!["extension-rdbms", "extension-stripe"]);
    }

    #[test]
    fn transitive_chain_and_diamond_are_deduplicated() {
        let registry = registry(vec![
            module("app", &[], &["b", "c"]),
            module("b", &["d"], &[]),
            module("c", &["d"], &[]),
            module("d", &[], &[]),
        ]);
        let resolved = resolve(scenario(&registry, "app"), &registry).expect("resolves");
        assert_eq!(resolved, vec!["d", "b", "c", "app"]);
    }

    #[test]
    fn unknown_dependency_names_the_missing_id() {
        let registry = registry(vec![module("extension-stripe", &[], &["extension-nosql"])]);
        let err = resolve(scenario(&registry, "extension-stripe"), &registry).expect_err("unknown");
        match err {
            ScenarioError::UnknownDependency { id, required_by } => {
                assert_eq!(id, "extension-nosql");
                assert_eq!(required_by, "extension-stripe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_reports_path_with_first_node_repeated() {
        let registry = registry(vec![
            module("app", &[], &["a"]),
            module("a", &["b"], &[]),
            module("b", &["a"], &[]),
        ]);
        let err = resolve(scenario(&registry, "app"), &registry).expect_err("cycle");
        match err {
            ScenarioError::DependencyCycle { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_back_to_owner_is_detected() {
        let registry = registry(vec![module("a", &[], &["b"]), module("b", &["a"], &[])]);
        let err = resolve(scenario(&registry, "a"), &registry).expect_err("cycle");
        assert!(matches!(err, ScenarioError::DependencyCycle { ref cycle } if cycle == &["a", "b", "a"]));
    }

    #[test]
    fn deep_chain_resolves_without_recursion() {
        let depth = 5_000;
        let mut modules = vec![module("m0", &[], &["m1"])];
        for i in 1..depth {
            let next = format!("m{}", i + 1);
            let deps: Vec<&str> = if i + 1 < depth { vec![next.as_str()] } else { vec![] };
            modules.push(module(&format!("m{i}"), &deps, &[]));
        }
        let registry = registry(modules);
        let resolved = resolve(scenario(&registry, "m0"), &registry).expect("resolves");
        assert_eq!(resolved.len(), depth);
        assert_eq!(resolved.first().map(String::as_str), Some(format!("m{}", depth - 1).as_str()));
        assert_eq!(resolved.last().map(String::as_str), Some("m0"));
    }

    #[test]
    fn unregistered_owner_is_a_schema_error() {
        let registry = registry(vec![module("a", &[], &[])]);
        let mut orphan = scenario(&registry, "a").clone();
        orphan.module_id = "ghost".into();
        let err = resolve(&orphan, &registry).expect_err("schema");
        assert!(matches!(err, ScenarioError::Schema(_)));
    }
}
