//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "04-validation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Expected file tree validation."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use crate::failure::Failure;
use crate::snapshot::Snapshot;

/// Report every expected path missing from `snapshot`, in declaration order.
///
/// Matching is exact and case-sensitive; files the snapshot has beyond the
/// expectation are permitted.
pub fn check_files<'a, I>(expected: I, snapshot: &Snapshot) -> Vec<Failure>
where
    I: IntoIterator<Item = &'a String>,
{
    expected
        .into_iter()
        .filter(|path| !snapshot.contains(path))
        .map(|path| Failure::MissingFile { path: path.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    fn expected(paths: &[&str]) -> IndexSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn superset_snapshot_has_no_failures() {
        let snapshot = Snapshot::from_files([
            ("backend/app_stripe/views.py", ""),
            ("backend/app_stripe/urls.py", ""),
            ("backend/app_stripe/admin.py", ""),
        ]);
        let failures = check_files(
            &expected(&["backend/app_stripe/views.py", "backend/app_stripe/urls.py"]),
            &snapshot,
        );
        assert!(failures.is_empty());
    }

    #[test]
    fn every_missing_path_is_reported_once() {
        let snapshot = Snapshot::from_files([("frontend/src/hooks/useStripe.ts", "")]);
        let failures = check_files(
            &expected(&[
                "frontend/src/components/stripe/CheckoutButton.tsx",
                "frontend/src/hooks/useStripe.ts",
                "frontend/.env",
            ]),
            &snapshot,
        );
        assert_eq!(
            failures,
            vec![
                Failure::MissingFile {
                    path: "frontend/src/components/stripe/CheckoutButton.tsx".into()
                },
                Failure::MissingFile {
                    path: "frontend/.env".into()
                },
            ]
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let snapshot = Snapshot::from_files([("Frontend/.env", "")]);
        let failures = check_files(&expected(&["frontend/.env"]), &snapshot);
        assert_eq!(failures.len(), 1);
    }
}
