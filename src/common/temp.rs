//! Staging directory lifecycle.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Recreate `parent_dir/name` empty, discarding whatever a previous run
/// left behind.
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .with_context(|| format!("Failed to clear {}", work_dir.display()))?;
    }
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    Ok(work_dir)
}

/// Create each relative subdirectory under `root`.
pub fn create_layout(root: &Path, dirs: &[&str]) -> Result<()> {
    for dir in dirs {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}
