//! Prepare the tree for publishing: keep only the allow-listed root
//! entries and pull secrets out of every subdirectory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::common::{move_path, remove_path, write_file_with_dirs};
use crate::config::Config;
use crate::privilege;
use crate::report::{Outcome, RunSummary};

use super::is_within;

/// Root entries that stay in the repository.
pub const KEEP_ROOT_ITEMS: [&str; 21] = [
    ".git",
    ".gitignore",
    ".env",
    "assets",
    "config",
    "docs",
    "lore",
    "scripts",
    "src",
    "templates",
    "signing_keys",
    "build.sh",
    "build3.sh",
    "quick_start.sh",
    "clean_and_unlock.sh",
    "requirements.txt",
    "README.md",
    "LICENSE",
    "GENOME.yaml",
    "USER_CONFIG.yaml",
    "FurryOS_Official_Handbook.pdf",
];

/// File names moved wherever they are found.
pub const SENSITIVE_FILES: [&str; 4] = [
    "Gemini_API.key.txt",
    "anthro_identity.key",
    "furryos_signing.key",
    "private.pem",
];

const DEFAULT_GITIGNORE: &str =
    "*.iso\n*.key\n*.key.txt\nvenv/\nfurryos_venv/\n__pycache__/\nbuild.log\n.DS_Store\n";

pub fn is_sensitive(name: &str) -> bool {
    SENSITIVE_FILES.contains(&name) || name.ends_with(".key") || name.ends_with(".iso")
}

/// Move `src` to `dest_dir/<name>`, replacing whatever is there.
fn move_replacing(src: &Path, dest_dir: &Path) -> Result<()> {
    let name = src
        .file_name()
        .with_context(|| format!("{} has no file name", src.display()))?;
    let dest = dest_dir.join(name);
    if dest.exists() || dest.is_symlink() {
        remove_path(&dest)?;
    }
    move_path(src, &dest)
}

/// Refuse to run over root-owned live-build state without root.
pub fn check_preconditions(config: &Config) -> Result<()> {
    if config.root.join("chroot").exists() && !privilege::is_root() {
        bail!(
            "Build artifacts (chroot/) detected; they are root-owned. Re-run with sudo, or run `furryos purge` first."
        );
    }
    Ok(())
}

pub fn prepare(config: &Config) -> Result<RunSummary> {
    check_preconditions(config)?;

    let mut summary = RunSummary::new("Prepare");
    let store = &config.artifact_dir;
    fs::create_dir_all(store)
        .with_context(|| format!("Cannot create artifact store {}", store.display()))?;

    println!("[1/3] Sweeping root directory...");
    let mut root_entries: Vec<_> = fs::read_dir(&config.root)
        .with_context(|| format!("Cannot read {}", config.root.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    root_entries.sort();

    for path in root_entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if KEEP_ROOT_ITEMS.contains(&name.as_str()) || is_within(&path, store) {
            continue;
        }
        let outcome = Outcome::from_result(move_replacing(&path, store));
        summary.record("Moved", Path::new(&name), outcome);
    }

    println!("[2/3] Scanning for sensitive files...");
    let sensitive: Vec<_> = WalkDir::new(&config.root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git" && !is_within(e.path(), store))
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir() && is_sensitive(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();

    for path in sensitive {
        let rel = path.strip_prefix(&config.root).unwrap_or(&path).to_path_buf();
        let outcome = Outcome::from_result(move_replacing(&path, store));
        summary.record("Secured", &rel, outcome);
    }

    println!("[3/3] Final checks...");
    let gitignore = config.root.join(".gitignore");
    if gitignore.exists() {
        summary.record(
            "Write",
            Path::new(".gitignore"),
            Outcome::Skipped("already present".into()),
        );
    } else {
        let result = write_file_with_dirs(&gitignore, DEFAULT_GITIGNORE);
        summary.record("Created", Path::new(".gitignore"), Outcome::from_result(result));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("Gemini_API.key.txt"));
        assert!(is_sensitive("private.pem"));
        assert!(is_sensitive("deploy.key"));
        assert!(is_sensitive("old.iso"));
        assert!(!is_sensitive("other.pem"));
        assert!(!is_sensitive("furryos_signing.pub"));
    }

    #[test]
    fn test_prepare_moves_and_flattens() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("proj");
        let config = Config::from_vars(&root, &Default::default());
        fs::create_dir_all(root.join("assets/keys")).unwrap();
        fs::create_dir_all(root.join("venv/bin")).unwrap();
        fs::write(root.join("assets/keys/Gemini_API.key.txt"), "k").unwrap();
        fs::write(root.join("assets/logo.png"), "p").unwrap();
        fs::write(root.join("build.log"), "l").unwrap();
        fs::write(root.join("README.md"), "r").unwrap();

        // Stale copy in the store gets replaced
        fs::create_dir_all(&config.artifact_dir).unwrap();
        fs::write(config.artifact_dir.join("build.log"), "stale").unwrap();

        let summary = prepare(&config).unwrap();
        assert_eq!(summary.fail_count(), 0);

        let store = &config.artifact_dir;
        assert_eq!(fs::read_to_string(store.join("build.log")).unwrap(), "l");
        assert!(store.join("venv/bin").is_dir());
        assert!(store.join("Gemini_API.key.txt").exists());
        assert!(!root.join("assets/keys/Gemini_API.key.txt").exists());
        assert!(root.join("assets/logo.png").exists());
        assert!(root.join("README.md").exists());
        assert!(root.join(".gitignore").exists());
    }
}
