// src/core/paths.rs

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The canonical current directory, so it compares equal to discovered project paths.
pub fn current_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Could not determine the current directory")?;
    dunce::canonicalize(&cwd).with_context(|| format!("Could not resolve '{}'", cwd.display()))
}

/// `path` relative to `root` for display, or `path` unchanged when it is outside `root`.
/// The root itself is shown as `.`.
pub fn display_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}
