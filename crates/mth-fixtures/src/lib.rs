//! ---
//! mth_section: "02-fixture-data-model"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Fixture schema definitions, validation and the module registry."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
//! Fixture definitions for generator modules.
//!
//! A fixture document describes one module: the scenarios that drive the
//! generator and the static validations applied to raw template sources.
//! Documents are parsed into strongly typed records, validated once, and
//! collected into an immutable [`Registry`] shared by every scenario run.
#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod parse;
pub mod registry;

pub use error::{SchemaError, SchemaResult};
pub use model::{FileContentCheck, Module, Scenario, ScenarioConfig, TemplateValidation};
pub use parse::{load, parse_module, FixtureFormat, RawModule};
pub use registry::Registry;
