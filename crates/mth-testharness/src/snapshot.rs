//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "03-generation"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Generated file-tree snapshots."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path};

use tracing::debug;
use walkdir::WalkDir;

/// File tree produced by one generator run: relative path to content.
///
/// Paths always use `/` separators. A snapshot is owned by exactly one
/// scenario execution and only ever read by the validators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, String>,
}

impl Snapshot {
    /// Build a snapshot from in-memory entries.
    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(path, content)| (path.into(), content.into()))
                .collect(),
        }
    }

    /// Collect every regular file below `root`. Non UTF-8 content is decoded
    /// lossily since checks are textual.
    pub fn from_dir(root: &Path) -> io::Result<Self> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            let key = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(entry.path())?;
            files.insert(key, String::from_utf8_lossy(&bytes).into_owned());
        }
        debug!(root = %root.display(), files = files.len(), "snapshot collected");
        Ok(Self { files })
    }

    /// Content of `path`, if generated.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Whether `path` was generated. Exact, case-sensitive match.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Generated paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the tree below `dir` for post-mortem inspection.
    ///
    /// Fails with `InvalidInput` before writing anything if a path is not a
    /// plain relative path.
    pub fn write_to(&self, dir: &Path) -> io::Result<()> {
        if let Some(path) = self.files.keys().find(|path| !is_plain_relative(path)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write snapshot entry outside {}: {path}", dir.display()),
            ));
        }
        for (path, content) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)?;
        }
        Ok(())
    }
}

fn is_plain_relative(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_walk_uses_relative_slash_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("frontend/src/hooks");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("useStripe.ts"), "loadStripe").expect("write");
        fs::write(dir.path().join("frontend/.env"), "VITE_STRIPE_PUBLISHABLE_KEY=pk").expect("write");

        let snapshot = Snapshot::from_dir(dir.path()).expect("collects");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("frontend/src/hooks/useStripe.ts"), Some("loadStripe"));
        assert!(snapshot.contains("frontend/.env"));
        assert!(!snapshot.contains("Frontend/.env"));
    }

    #[test]
    fn write_to_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = Snapshot::from_files([("backend/app_stripe/urls.py", "webhook")]);
        snapshot.write_to(dir.path()).expect("writes");
        let reread = Snapshot::from_dir(dir.path()).expect("collects");
        assert_eq!(reread, snapshot);
    }

    #[test]
    fn write_to_refuses_escaping_entries() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("retained");
        for entry in ["../outside.txt", "/etc/absolute.txt", "a/../../b.txt"] {
            let snapshot = Snapshot::from_files([("kept.txt", "x"), (entry, "y")]);
            let err = snapshot.write_to(&dir).expect_err("must refuse");
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{entry}");
        }
        assert!(!dir.exists());
        assert!(!root.path().join("outside.txt").exists());
    }
}
