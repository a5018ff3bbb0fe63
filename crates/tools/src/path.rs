//! Path guard shared by the file tools.
//!
//! A path is usable when it has no `..` components, is not under a
//! forbidden prefix, and (if any roots are configured) sits under one of
//! the allowed roots. Comparison happens on the resolved path so a symlink
//! cannot smuggle a forbidden target past the check.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("'{0}' contains a '..' component")]
    Traversal(String),

    #[error("'{path}' is under forbidden path '{pattern}'")]
    Forbidden { path: String, pattern: String },

    #[error("'{0}' is outside the allowed roots")]
    OutsideRoots(String),
}

#[derive(Debug, Clone, Default)]
pub struct PathGuard {
    allowed_roots: Vec<String>,
    forbidden_paths: Vec<String>,
}

impl PathGuard {
    pub fn new(allowed_roots: Vec<String>, forbidden_paths: Vec<String>) -> Self {
        Self {
            allowed_roots,
            forbidden_paths,
        }
    }

    /// No restrictions beyond rejecting `..`.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Check `path` and return the resolved form to operate on.
    pub fn check(&self, path: &str) -> Result<PathBuf, PathError> {
        let input = Path::new(path);
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathError::Traversal(path.into()));
        }

        let resolved = resolve(input);
        let normalized = normalize(&resolved.to_string_lossy());

        if let Some(pattern) = self
            .forbidden_paths
            .iter()
            .find(|p| is_under(&normalized, &pattern_prefix(p)))
        {
            return Err(PathError::Forbidden {
                path: path.into(),
                pattern: pattern.clone(),
            });
        }

        if !self.allowed_roots.is_empty()
            && !self
                .allowed_roots
                .iter()
                .any(|root| is_under(&normalized, &pattern_prefix(root)))
        {
            return Err(PathError::OutsideRoots(path.into()));
        }

        Ok(resolved)
    }
}

/// Canonicalize the path, or its parent when the file does not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            resolve(parent).join(name)
        }
        _ => path.to_path_buf(),
    }
}

fn pattern_prefix(pattern: &str) -> String {
    normalize(&resolve(Path::new(&expand_tilde(pattern))).to_string_lossy())
}

fn normalize(path: &str) -> String {
    let forward = path.replace('\\', "/");
    let trimmed = forward.strip_prefix("//?/").unwrap_or(&forward);
    let lowered = trimmed.to_lowercase();
    match lowered.trim_end_matches('/') {
        "" => "/".to_string(),
        rest => rest.to_string(),
    }
}

/// Prefix match on whole components: `/etc` covers `/etc/passwd` but not `/etcetera`.
fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        let home = modai_config::dirs_home();
        return path.replacen('~', &home.to_string_lossy(), 1);
    }
    path.to_string()
}
