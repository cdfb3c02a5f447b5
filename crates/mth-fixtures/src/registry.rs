//! ---
//! mth_section: "02-fixture-data-model"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Fixture schema definitions, validation and the module registry."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{SchemaError, SchemaResult};
use crate::model::{Module, Scenario};
use crate::parse::{parse_module, FixtureFormat};

/// Immutable set of loaded modules keyed by module id.
///
/// Built once before any scenario runs and shared read-only (typically
/// behind an `Arc`) for the rest of the harness lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    modules: IndexMap<String, Module>,
}

impl Registry {
    /// Build a registry, rejecting duplicate module ids.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> SchemaResult<Self> {
        let mut map = IndexMap::new();
        for module in modules {
            if map.contains_key(&module.id) {
                return Err(SchemaError::DuplicateModule { module: module.id });
            }
            map.insert(module.id.clone(), module);
        }
        Ok(Self { modules: map })
    }

    /// Load every fixture document in `dir`, in file-name order.
    ///
    /// Files with unrecognised extensions are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> SchemaResult<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| SchemaError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SchemaError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && FixtureFormat::from_path(&path).is_some() {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-fixture entry");
            }
        }
        paths.sort();

        let mut modules = Vec::with_capacity(paths.len());
        for path in &paths {
            modules.push(load_file(path)?);
        }
        let registry = Self::from_modules(modules)?;
        info!(
            directory = %dir.display(),
            modules = registry.len(),
            scenarios = registry.scenario_count(),
            "fixture registry loaded"
        );
        Ok(registry)
    }

    /// Look up a module by id.
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Whether a module id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// Iterate modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total scenarios across all modules.
    pub fn scenario_count(&self) -> usize {
        self.modules.values().map(|m| m.scenarios.len()).sum()
    }

    /// Look up a scenario by module id and scenario name.
    pub fn scenario(&self, module_id: &str, name: &str) -> Option<&Scenario> {
        self.module(module_id)?.scenario(name)
    }
}

/// Load a single fixture file, inferring the format from its extension.
pub fn load_file(path: &Path) -> SchemaResult<Module> {
    let format = FixtureFormat::from_path(path).ok_or_else(|| SchemaError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    debug!(path = %path.display(), ?format, "parsing fixture");
    parse_module(&text, format, &path.display().to_string())
}
