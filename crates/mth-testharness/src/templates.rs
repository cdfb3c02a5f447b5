//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "04-validation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Raw template source policy checks."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use mth_fixtures::{Module, TemplateValidation};
use mth_logging::{log_stage_event, LogContext, StageOutcome};
use thiserror::Error;
use tracing::warn;

use crate::content::evaluate_substrings;
use crate::failure::Failure;
use crate::report::TemplateReport;

#[derive(Debug, Error)]
pub enum TemplateStoreError {
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("failed to read template '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Read access to unrendered template sources.
pub trait TemplateStore: Send + Sync {
    fn read_raw(&self, template: &str) -> Result<String, TemplateStoreError>;
}

/// Templates on disk below a root directory.
///
/// Paths are joined literally; placeholder segments such as
/// `{{packagePath}}` name real directories in the template tree.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateStore for FsTemplateStore {
    fn read_raw(&self, template: &str) -> Result<String, TemplateStoreError> {
        let relative = Path::new(template);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if template.is_empty() || escapes {
            return Err(TemplateStoreError::NotFound(template.to_string()));
        }
        let path = self.root.join(relative);
        match fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(TemplateStoreError::NotFound(template.to_string()))
            }
            Err(source) => Err(TemplateStoreError::Io {
                path: template.to_string(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.templates.insert(path.into(), content.into());
        self
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn read_raw(&self, template: &str) -> Result<String, TemplateStoreError> {
        self.templates
            .get(template)
            .cloned()
            .ok_or_else(|| TemplateStoreError::NotFound(template.to_string()))
    }
}

/// Apply one template validation to the raw source held by `store`.
///
/// An unreadable source is reported as `TemplateNotFound`, never as a
/// harness error.
pub fn check_template(validation: &TemplateValidation, store: &dyn TemplateStore) -> Vec<Failure> {
    match store.read_raw(&validation.template) {
        Ok(content) => evaluate_substrings(
            &validation.template,
            &content,
            &validation.contains,
            &validation.not_contains,
        ),
        Err(err) => {
            if let TemplateStoreError::Io { .. } = err {
                warn!(template = %validation.template, error = %err, "template unreadable");
            }
            vec![Failure::TemplateNotFound {
                path: validation.template.clone(),
            }]
        }
    }
}

/// Apply every template validation of `module`, in declaration order.
pub fn check_module_templates(module: &Module, store: &dyn TemplateStore) -> Vec<TemplateReport> {
    module
        .template_validations
        .iter()
        .map(|validation| {
            let failures = check_template(validation, store);
            let ctx = LogContext::new()
                .with_module(&module.id)
                .with_scenario(&validation.name);
            let outcome = if failures.is_empty() {
                StageOutcome::Success
            } else {
                StageOutcome::Failed
            };
            log_stage_event(
                Some(&ctx),
                "template.checked",
                &format!("{} failure(s)", failures.len()),
                outcome,
            );
            TemplateReport {
                module_id: module.id.clone(),
                name: validation.name.clone(),
                template: validation.template.clone(),
                reason: validation.reason.clone(),
                failures,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    const USE_STRIPE: &str = "extension-stripe/code-react/src/hooks/useStripe.ts.mustache";

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn publishable_key_rule() -> TemplateValidation {
        TemplateValidation {
            name: "frontend-uses-publishable-key".into(),
            template: USE_STRIPE.into(),
            contains: set(&["VITE_STRIPE_PUBLISHABLE_KEY"]),
            not_contains: set(&["STRIPE_API_KEY", "sk_"]),
            reason: "Security: Frontend must never access secret API key".into(),
        }
    }

    #[test]
    fn clean_template_passes_secret_rule() {
        let store = InMemoryTemplateStore::new().with_template(
            USE_STRIPE,
            "const stripe = loadStripe(import.meta.env.VITE_STRIPE_PUBLISHABLE_KEY);",
        );
        assert!(check_template(&publishable_key_rule(), &store).is_empty());
    }

    #[test]
    fn secret_key_reference_is_forbidden() {
        let store = InMemoryTemplateStore::new().with_template(
            USE_STRIPE,
            "VITE_STRIPE_PUBLISHABLE_KEY\nconst secret = 'sk_test_abc';",
        );
        assert_eq!(
            check_template(&publishable_key_rule(), &store),
            vec![Failure::ForbiddenSubstring {
                file: USE_STRIPE.into(),
                substring: "sk_".into()
            }]
        );
    }

    #[test]
    fn missing_template_is_reported_not_raised() {
        let store = InMemoryTemplateStore::new();
        assert_eq!(
            check_template(&publishable_key_rule(), &store),
            vec![Failure::TemplateNotFound {
                path: USE_STRIPE.into()
            }]
        );
    }

    #[test]
    fn filesystem_store_takes_placeholder_segments_literally() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template =
            "extension-stripe/code-spring/src/main/java/{{packagePath}}/config/StripeConfig.java.mustache";
        let path = dir.path().join(template);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "@Profile(\"stripe\")").expect("write");

        let store = FsTemplateStore::new(dir.path());
        assert_eq!(store.read_raw(template).expect("reads"), "@Profile(\"stripe\")");
        assert!(matches!(
            store.read_raw("extension-stripe/absent.mustache"),
            Err(TemplateStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read_raw("../outside.mustache"),
            Err(TemplateStoreError::NotFound(_))
        ));
    }
}
