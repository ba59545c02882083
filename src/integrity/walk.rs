//! Directory enumeration for tree signing.

use crate::error::{Result, SignerError};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Files found under a directory, plus entries that could not be read.
#[derive(Debug, Default)]
pub struct FileWalk {
    pub files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

/// Recursively list regular files under `dir` in file-name order.
///
/// Nothing is skipped: hidden files and ignore files are not honored.
/// Symlinked directories are not descended into, but a symlink to anything
/// else is returned like a file, so its target gets signed (and a dangling
/// one fails to read later). `keep` decides which files are returned.
///
/// # Errors
///
/// Returns [`SignerError::Walk`] if `dir` is not a directory.
pub fn files_under(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<FileWalk> {
    if !dir.is_dir() {
        return Err(SignerError::Walk(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut walk = FileWalk::default();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|t| {
                    t.is_file() || (t.is_symlink() && !entry.path().is_dir())
                });
                if is_file && keep(entry.path()) {
                    walk.files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                walk.errors.push(e.to_string());
            }
        }
    }
    Ok(walk)
}
