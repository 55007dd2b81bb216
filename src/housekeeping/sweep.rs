//! Deep clean: move heavy and binary artifacts out of the repository.
//!
//! Matching directories and files are moved to the artifact store under
//! their path relative to the project root. The walk never enters `.git`
//! or the artifact store, and never descends into a directory it has just
//! decided to move.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::{move_path, write_file_with_dirs};
use crate::config::Config;
use crate::report::{Outcome, RunSummary};

use super::{is_within, unique_destination};

/// Directory names moved wholesale.
pub const BAD_FOLDERS: [&str; 8] = [
    "__pycache__",
    "venv",
    "furryos_venv",
    "chroot",
    "binary",
    ".build",
    "cache",
    "local",
];

/// File extensions (without the dot) moved individually.
pub const BINARY_EXTENSIONS: [&str; 16] = [
    "iso", "squashfs", "img", "bin", "exe", "dll", "so", "elf", "o", "obj", "pyc", "cpt", "bak",
    "swp", "key", "pem",
];

pub const GITIGNORE: &str = "\
# OS artifacts
*.iso
*.squashfs
*.img
*.bin

# Compiled binaries
*.exe
*.dll
*.so
*.o
*.obj
*.elf

# live-build state
chroot/
binary/
cache/
.build/
local/
build_artifacts/
furryos_build/
output/

# Python
__pycache__/
*.pyc
venv/
furryos_venv/

# Secrets
*.key
*.pem
*.key.txt
.env
";

/// Whether a file name carries one of [`BINARY_EXTENSIONS`].
pub fn is_binary_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Everything a sweep would move, in walk order.
pub fn find_candidates(root: &Path, artifact_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("sweep: {}", e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();

        if entry.file_type().is_dir() {
            if name == ".git" || is_within(entry.path(), artifact_dir) {
                walker.skip_current_dir();
                continue;
            }
            if BAD_FOLDERS.contains(&name.as_ref()) {
                candidates.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
            continue;
        }

        if is_binary_artifact(entry.path()) {
            candidates.push(entry.path().to_path_buf());
        }
    }
    Ok(candidates)
}

/// Run the sweep and write `.gitignore`.
pub fn sweep(config: &Config) -> Result<RunSummary> {
    let mut summary = RunSummary::new("Sweep");

    println!("Sweeping {} for heavy and binary artifacts...", config.root.display());
    println!("  Artifact store: {}", config.artifact_dir.display());

    fs::create_dir_all(&config.artifact_dir)?;

    for path in find_candidates(&config.root, &config.artifact_dir)? {
        let rel = path.strip_prefix(&config.root).unwrap_or(&path);
        let dest = unique_destination(&config.artifact_dir.join(rel));
        let outcome = Outcome::from_result(move_path(&path, &dest));
        summary.record("Moved", rel, outcome);
    }

    let gitignore = config.root.join(".gitignore");
    let result = write_file_with_dirs(&gitignore, GITIGNORE);
    summary.record("Wrote", Path::new(".gitignore"), Outcome::from_result(result));

    Ok(summary)
}
