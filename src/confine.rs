use std::path::{Component, Path, PathBuf};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfinementError {
    #[error("empty path")]
    Empty,
    /// The root stays out of the message; it is only logged.
    #[error("'{path}' resolves outside the data root")]
    OutsideRoot { path: String },
}

/// Keeps filesystem access under one approved root.
///
/// Relative paths are taken relative to the root; absolute paths must already
/// point inside it. `..` is resolved lexically first, then the deepest
/// existing ancestor is canonicalized so a symlink cannot lead out.
#[derive(Debug, Clone)]
pub struct PathConfinement {
    root: PathBuf,
}

impl PathConfinement {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ConfinementError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfinementError::Empty);
        }

        let path = Path::new(raw);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let resolved = normalize(&joined);

        if !resolved.starts_with(&self.root) || !self.real_location_inside(&resolved) {
            warn!(path = raw, root = %self.root.display(), "path escapes data root");
            return Err(ConfinementError::OutsideRoot {
                path: raw.to_string(),
            });
        }
        Ok(resolved)
    }

    fn real_location_inside(&self, resolved: &Path) -> bool {
        let existing = resolved.ancestors().find(|p| p.exists());
        match existing.map(std::fs::canonicalize) {
            Some(Ok(real)) => real.starts_with(&self.root),
            _ => true,
        }
    }
}

/// Lexical normalization: drops `.`, applies `..` without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
