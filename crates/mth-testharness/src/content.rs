//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "04-validation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Literal substring assertions over generated content."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use mth_fixtures::FileContentCheck;

use crate::failure::Failure;
use crate::snapshot::Snapshot;

/// Evaluate required and forbidden substrings against `content`.
///
/// Literal, case-sensitive search. Every rule is evaluated; failures come
/// out in rule order, required before forbidden.
pub fn evaluate_substrings<'a>(
    label: &str,
    content: &str,
    contains: impl IntoIterator<Item = &'a String>,
    not_contains: impl IntoIterator<Item = &'a String>,
) -> Vec<Failure> {
    let missing = contains
        .into_iter()
        .filter(|needle| !content.contains(needle.as_str()))
        .map(|needle| Failure::MissingSubstring {
            file: label.to_string(),
            substring: needle.clone(),
        });
    let forbidden = not_contains
        .into_iter()
        .filter(|needle| content.contains(needle.as_str()))
        .map(|needle| Failure::ForbiddenSubstring {
            file: label.to_string(),
            substring: needle.clone(),
        });
    missing.chain(forbidden).collect()
}

/// Run every content check against `snapshot`.
///
/// A check whose file was not generated yields a single `FileNotFound` and
/// evaluation continues with the next check.
pub fn check_contents(checks: &[FileContentCheck], snapshot: &Snapshot) -> Vec<Failure> {
    let mut failures = Vec::new();
    for check in checks {
        match snapshot.get(&check.file) {
            Some(content) => failures.extend(evaluate_substrings(
                &check.file,
                content,
                &check.contains,
                &check.not_contains,
            )),
            None => failures.push(Failure::FileNotFound {
                file: check.file.clone(),
            }),
        }
    }
    failures
}
