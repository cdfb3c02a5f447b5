//! ---
//! mth_section: "02-fixture-data-model"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Fixture schema definitions, validation and the module registry."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::path::PathBuf;

/// Shared result type for fixture loading routines.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Structural problems detected while loading fixture definitions.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The document could not be decoded into the fixture shape.
    #[error("{source_name}: malformed fixture at `{field}`: {message}")]
    Malformed {
        /// File name or other label for the document.
        source_name: String,
        /// Dotted path of the offending field (`.` for the document root).
        field: String,
        /// Decoder message.
        message: String,
    },
    /// A required textual field is present but blank.
    #[error("module '{module}': field `{field}` must not be empty")]
    EmptyField {
        /// Owning module identifier (may be empty when the id itself is blank).
        module: String,
        /// Field path within the module.
        field: String,
    },
    /// Two scenarios in one module share a name.
    #[error("module '{module}': duplicate scenario name '{scenario}'")]
    DuplicateScenario {
        /// Owning module identifier.
        module: String,
        /// Colliding scenario name.
        scenario: String,
    },
    /// Two template validations in one module share a name.
    #[error("module '{module}': duplicate template validation name '{name}'")]
    DuplicateTemplateValidation {
        /// Owning module identifier.
        module: String,
        /// Colliding validation name.
        name: String,
    },
    /// Two fixture documents declare the same module id.
    #[error("duplicate module id '{module}'")]
    DuplicateModule {
        /// Colliding module identifier.
        module: String,
    },
    /// A file or template path is not a clean relative path.
    #[error("module '{module}': invalid path '{path}' in {field}: {reason}")]
    InvalidPath {
        /// Owning module identifier.
        module: String,
        /// Field the path was found in.
        field: String,
        /// Offending path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },
    /// The fixture file extension is not one of json, yaml, yml, toml.
    #[error("unsupported fixture format for {path:?}")]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
    },
    /// A fixture file or directory could not be read.
    #[error("failed to read fixtures from {path:?}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}
