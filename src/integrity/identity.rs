//! File identities: the ledger's lookup keys.
//!
//! An identity is the path of a file relative to the signing root, with `.`
//! and `..` resolved lexically and components joined by `/` on every
//! platform. Signer and verifier compute the same identity for a file as
//! long as they agree on the root.

use crate::error::{Result, SignerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Normalized root-relative path of a signed file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentity(String);

impl FileIdentity {
    /// Wrap an identity string as stored in a ledger.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Compute the identity of `path` relative to `root`.
    ///
    /// Relative paths are taken relative to the process working directory,
    /// exactly as file system calls would. Symlinks are not followed.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidPath`] if `path` is not strictly inside
    /// `root` or is not valid UTF-8.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self> {
        let root = lexical_absolute(root)?;
        let full = lexical_absolute(path)?;
        let relative = full.strip_prefix(&root).map_err(|_prefix_err| {
            SignerError::InvalidPath(format!(
                "{} is outside the signing root {}",
                path.display(),
                root.display()
            ))
        })?;

        let mut segments = Vec::new();
        for component in relative.components() {
            let segment = component.as_os_str().to_str().ok_or_else(|| {
                SignerError::InvalidPath(format!("{} is not valid UTF-8", path.display()))
            })?;
            segments.push(segment);
        }
        if segments.is_empty() {
            return Err(SignerError::InvalidPath(format!(
                "{} is the signing root itself, not a file in it",
                path.display()
            )));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of the identified file under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }

    /// Whether this identity is `prefix` or lies underneath it.
    ///
    /// `None` stands for the root and contains everything.
    pub fn is_within(&self, prefix: Option<&Self>) -> bool {
        match prefix {
            None => true,
            Some(prefix) => {
                self.0 == prefix.0
                    || self
                        .0
                        .strip_prefix(prefix.0.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Make `path` absolute and resolve `.` and `..` without touching the disk.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined.
pub fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
