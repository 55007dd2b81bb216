//! Project-tree housekeeping.
//!
//! Each pass walks the project and applies one transformation, recording
//! every file it touches in a [`RunSummary`](crate::report::RunSummary).
//! A failure on one file never stops the pass, and nothing is rolled back.

pub mod manifest;
pub mod organize;
pub mod prepare;
pub mod purge;
pub mod sweep;
pub mod tree;

use std::fs;
use std::path::{Path, PathBuf};

/// Whether `path` is `dir` or inside it. Compares canonical forms when
/// both exist so `..` in the configured artifact path does not matter.
pub fn is_within(path: &Path, dir: &Path) -> bool {
    let canon = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    canon(path).starts_with(canon(dir))
}

/// First free destination: `dst`, then `dst.1`, `dst.2`, ...
pub fn unique_destination(dst: &Path) -> PathBuf {
    if !dst.exists() && !dst.is_symlink() {
        return dst.to_path_buf();
    }
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (1..)
        .map(|n| dst.with_file_name(format!("{}.{}", name, n)))
        .find(|candidate| !candidate.exists() && !candidate.is_symlink())
        .unwrap_or_else(|| dst.to_path_buf())
}
