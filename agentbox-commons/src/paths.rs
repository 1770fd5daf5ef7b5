use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Failure to place a requested path inside the project root.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("access denied: '{requested}' resolves outside the project directory")]
    OutsideRoot { requested: String },
    #[error("failed to resolve '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Canonicalize a path with fallback to the original path if canonicalization fails.
pub fn canonicalize_workspace(workspace_root: &Path) -> PathBuf {
    std::fs::canonicalize(workspace_root).unwrap_or_else(|error| {
        warn!(
            path = %workspace_root.display(),
            %error,
            "failed to canonicalize project root; falling back to provided path"
        );
        workspace_root.to_path_buf()
    })
}

/// Resolve `requested` against `root` and return an absolute path that is
/// guaranteed to stay under `root`.
///
/// Relative paths are joined onto the root, absolute paths are taken as-is,
/// and `..` components are folded lexically before the containment check.
/// The target does not need to exist: the deepest existing ancestor is
/// canonicalized (following symlinks) and must also live under the root, so a
/// symlink inside the project cannot carry a read or write outside of it.
pub fn resolve_within_root(root: &Path, requested: &str) -> Result<PathBuf, PathError> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let root = canonicalize_workspace(root);
    let outside = || PathError::OutsideRoot {
        requested: trimmed.to_string(),
    };

    let candidate = normalize_path(&root.join(trimmed));
    if !candidate.starts_with(&root) {
        return Err(outside());
    }

    let (existing, remainder) = split_existing_ancestor(&candidate);
    let canonical = std::fs::canonicalize(&existing).map_err(|source| PathError::Io {
        path: existing.clone(),
        source,
    })?;
    if !canonical.starts_with(&root) {
        return Err(outside());
    }

    let mut resolved = canonical;
    for part in remainder.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

/// Split `path` into its deepest ancestor that exists on disk (symlinks count
/// as existing even when dangling) and the missing trailing components, which
/// are returned innermost-first.
fn split_existing_ancestor(path: &Path) -> (PathBuf, Vec<PathBuf>) {
    let mut missing = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        if current.symlink_metadata().is_ok() {
            return (current, missing);
        }
        let Some(name) = current.file_name().map(PathBuf::from) else {
            return (current, missing);
        };
        missing.push(name);
        if !current.pop() {
            return (current, missing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn normalize_folds_parent_components() {
        assert_eq!(
            normalize_path(Path::new("/work/src/../lib/./mod.rs")),
            PathBuf::from("/work/lib/mod.rs")
        );
    }

    #[test]
    fn resolves_existing_file_inside_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let resolved = resolve_within_root(dir.path(), "notes.txt").unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(resolved, root.join("notes.txt"));
    }

    #[test]
    fn resolves_missing_nested_path_for_writes() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_within_root(dir.path(), "a/b/c.txt").unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(resolved, root.join("a").join("b").join("c.txt"));
    }

    #[test]
    fn rejects_parent_traversal() {
        let dir = TempDir::new().unwrap();
        let err = resolve_within_root(dir.path(), "../outside.txt").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));

        let err = resolve_within_root(dir.path(), "src/../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }

    #[test]
    fn rejects_absolute_path_elsewhere() {
        let dir = TempDir::new().unwrap();
        let err = resolve_within_root(dir.path(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }

    #[test]
    fn accepts_absolute_path_inside_root() {
        let dir = TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let inside = root.join("file.txt");
        let resolved = resolve_within_root(dir.path(), &inside.to_string_lossy()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[test]
    fn rejects_empty_path() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_within_root(dir.path(), "   "),
            Err(PathError::Empty)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let err = resolve_within_root(dir.path(), "link/secret.txt").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));

        let err = resolve_within_root(dir.path(), "link/new.txt").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }
}
