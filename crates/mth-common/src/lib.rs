//! ---
//! mth_section: "01-core-functionality"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Shared primitives and utilities for the harness runtime."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
//! Core shared primitives for the MTH workspace.
//! This crate exposes configuration loading, tracing setup and time
//! utilities consumed by the harness library and the control CLI.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    FixturesConfig, GeneratorConfig, HarnessConfig, LoadedHarnessConfig, LoggingConfig,
    RunnerConfig, TemplatesConfig,
};
pub use logging::{init_tracing, LogFormat};
