//! Path sandboxing against a single trusted root.
//!
//! Every user-controlled path is made absolute against a base directory,
//! normalized (`.` and `..` resolved lexically) and then checked to lie inside
//! the trusted root. The check is pure path manipulation with no filesystem
//! I/O, so it works for outputs that do not exist yet.

use crate::error::{BuildError, BuildResult};
use std::path::{Component, Path, PathBuf};

/// A trusted root directory that resolved paths may not escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSandbox {
    /// Absolute, normalized root.
    root: PathBuf,
}

impl PathSandbox {
    /// Create a sandbox rooted at `root`.
    ///
    /// A relative root is resolved against the current working directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(root)
        };
        Self {
            root: normalize_path_components(&absolute),
        }
    }

    /// Sandbox rooted at the process working directory.
    pub fn from_current_dir() -> BuildResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::io("Failed to read current directory", e))?;
        Ok(Self::new(cwd))
    }

    /// Get the resolved root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `candidate` against `base` and verify it stays inside the root.
    ///
    /// A relative `base` is itself taken relative to the root. Absolute
    /// candidates ignore `base` but are still checked.
    pub fn resolve(&self, candidate: impl AsRef<Path>, base: &Path) -> BuildResult<PathBuf> {
        let candidate = candidate.as_ref();
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.absolute_base(base).join(candidate)
        };

        let normalized = normalize_path_components(&absolute);
        if self.relative(&normalized).is_none() {
            return Err(BuildError::path_escape(candidate, &self.root));
        }
        Ok(normalized)
    }

    /// Path of `path` relative to the root, or `None` when it points outside.
    ///
    /// The root itself maps to an empty relative path.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.root).ok()?;
        match relative.components().next() {
            Some(Component::ParentDir) | Some(Component::RootDir) | Some(Component::Prefix(_)) => {
                None
            }
            _ => Some(relative.to_path_buf()),
        }
    }

    fn absolute_base(&self, base: &Path) -> PathBuf {
        if base.is_absolute() {
            base.to_path_buf()
        } else {
            self.root.join(base)
        }
    }
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => {
                // Windows drive prefix (e.g., C:)
                components.push(Component::Prefix(p));
            }
            Component::RootDir => {
                components.push(Component::RootDir);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else {
                    // Can't go up from root, keep the component
                    // (this handles edge cases like `/../foo`)
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => {
                components.push(Component::Normal(name));
            }
        }
    }

    components.iter().collect()
}
