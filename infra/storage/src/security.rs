use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn traversal(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Collapses `.` / `..` lexically; `..` may never climb above the configuration directory.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(path, "Path attempted to escape sandbox via '..'"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(traversal(path, "Absolute paths are not allowed in sandbox"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(StorageError::FileNotFound {
            message: path.display().to_string().into(),
            context: Some("Path does not name a file".into()),
        });
    }

    Ok(out)
}

/// Safely joins a path to the root and ensures it doesn't escape the sandbox.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();

    if path.is_absolute() {
        return Err(traversal(path, "Absolute paths are not allowed in sandbox"));
    }

    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => {
            Err(traversal(&canonical, "Path resolves outside the sandbox through a symlink"))
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_ancestors(root, &joined),
        Err(e) => Err(StorageError::Io { source: e, context: None }),
    }
}

/// Validates a path that doesn't exist yet through its first existing ancestor, which must
/// canonicalize inside the sandbox (guards against symlinked parent directories).
fn validate_ancestors(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    if !joined.starts_with(root) {
        return Err(traversal(joined, "Path is outside sandbox boundaries"));
    }

    for ancestor in joined.ancestors() {
        if ancestor == root {
            return Ok(joined.to_path_buf());
        }
        if !ancestor.exists() {
            continue;
        }
        return match ancestor.canonicalize() {
            Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
            Ok(canonical) => {
                Err(traversal(&canonical, "Existing parent directory is a symlink outside sandbox"))
            },
            Err(e) => Err(StorageError::Io {
                source: e,
                context: Some("Failed to verify parent directory".into()),
            }),
        };
    }

    Err(traversal(joined, "No valid parent directory found within sandbox"))
}
