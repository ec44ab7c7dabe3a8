//! Path normalization shared by the configuration layers.

use std::path::{Path, PathBuf};

/// Expands a leading tilde using the current user's home directory.
pub fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Expands and resolves a path against the current working directory.
///
/// Paths that cannot be resolved (an empty path, an unreadable working
/// directory) come back expanded but otherwise as given.
pub fn absolutize(path: &Path) -> PathBuf {
    let expanded = expand(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}
