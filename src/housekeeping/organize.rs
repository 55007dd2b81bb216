//! Classify loose files into canonical top-level folders by extension.
//!
//! Without confirmation only the plan is printed. When a destination name
//! is taken, the existing file is first moved to
//! `ARCHIVE_<timestamp>/<name>.<timestamp>.bak`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::move_path;
use crate::config::Config;
use crate::report::{Outcome, RunSummary};

use super::is_within;

/// Canonical folders. Files already inside one are left alone.
pub const CANONICAL_DIRS: [&str; 8] =
    ["scripts", "assets", "config", "docs", "build", "tests", "src", "logs"];

/// Directory names never entered.
const SKIP_DIRS: [&str; 6] = [".git", "__pycache__", ".venv", "venv", "furryos_venv", "node_modules"];

/// Root entries that drive the build and must stay where they are.
const PINNED_ROOT_FILES: [&str; 9] = [
    "build.sh",
    "build3.sh",
    "quick_start.sh",
    "GENOME.yaml",
    "USER_CONFIG.yaml",
    "USERCONFIG.yaml",
    "README.md",
    "requirements.txt",
    ".env",
];

/// Target folder for an extension (lowercase, with the leading dot).
pub fn target_for_extension(ext: &str) -> Option<&'static str> {
    let dir = match ext {
        ".sh" | ".py" | ".rb" | ".js" | ".ps1" | ".bat" => "scripts",
        ".exe" | ".dll" | ".so" | ".bin" | ".apk" | ".ipa" | ".deb" | ".rpm" | ".dmg"
        | ".iso" | ".zip" | ".tar.gz" | ".tar.xz" | ".tar.bz2" | ".rar" | ".7z" => "build",
        ".png" | ".jpg" | ".jpeg" | ".gif" | ".svg" | ".ico" | ".webp" | ".mp3" | ".wav"
        | ".mp4" | ".avi" | ".mov" => "assets",
        ".yaml" | ".yml" | ".conf" | ".json" | ".ini" | ".toml" | ".env" => "config",
        ".md" | ".txt" | ".rst" | ".rtf" | ".pdf" => "docs",
        ".log" => "logs",
        ".test" | ".spec" | ".e2e" => "tests",
        _ => return None,
    };
    Some(dir)
}

/// Full extension of a file name, folding `.tar.*` double extensions and
/// their short aliases (`.tgz` and friends) into one key.
pub fn full_extension(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let dot = lower.rfind('.')?;
    if dot == 0 {
        // Dotfiles such as `.env` are their own extension
        return Some(lower);
    }
    let suffix = &lower[dot..];
    let ext = match suffix {
        ".tgz" => ".tar.gz".to_string(),
        ".tbz2" => ".tar.bz2".to_string(),
        ".txz" => ".tar.xz".to_string(),
        ".gz" | ".bz2" | ".xz" if lower[..dot].ends_with(".tar") => format!(".tar{}", suffix),
        _ => suffix.to_string(),
    };
    Some(ext)
}

/// One planned move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub target_dir: PathBuf,
}

impl PlannedMove {
    pub fn destination(&self) -> PathBuf {
        let name = self.source.file_name().unwrap_or_default();
        self.target_dir.join(name)
    }
}

/// Directories excluded from the plan besides the canonical folders:
/// the content bundle, build and live-build state, and archives.
fn excluded_root_dirs(config: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![
        config.content_dir.clone(),
        config.build_dir.clone(),
        config.output_dir.clone(),
        config.kernel_dir.clone(),
        config.artifact_dir.clone(),
        config.signing_key_dir.clone(),
    ];
    for name in super::sweep::BAD_FOLDERS {
        dirs.push(config.root.join(name));
    }
    for name in CANONICAL_DIRS {
        dirs.push(config.root.join(name));
    }
    dirs
}

/// Compute the moves without touching anything.
pub fn plan(config: &Config) -> Vec<PlannedMove> {
    let root = &config.root;
    let excluded = excluded_root_dirs(config);
    let mut moves = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !(SKIP_DIRS.contains(&name.as_ref())
                || name.starts_with("ARCHIVE_")
                || excluded.iter().any(|d| e.path() == d || is_within(e.path(), d)))
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.depth() == 1 && PINNED_ROOT_FILES.contains(&name.as_ref()) {
            continue;
        }
        let Some(target) = full_extension(&name).and_then(|ext| target_for_extension(&ext))
        else {
            continue;
        };
        let target_dir = root.join(target);
        if entry.path().parent() == Some(target_dir.as_path()) {
            continue;
        }
        moves.push(PlannedMove {
            source: entry.path().to_path_buf(),
            target_dir,
        });
    }
    moves
}

/// Print the plan relative to the project root.
pub fn print_plan(config: &Config, moves: &[PlannedMove]) {
    if moves.is_empty() {
        println!("Everything is organized already; nothing to move.");
        return;
    }
    println!("Planned moves ({}):", moves.len());
    for m in moves {
        let from = m.source.strip_prefix(&config.root).unwrap_or(&m.source);
        let to = m.destination();
        let to = to.strip_prefix(&config.root).unwrap_or(&to).to_path_buf();
        println!("  {} -> {}", from.display(), to.display());
    }
}

/// Execute a plan, backing up collisions into a timestamped archive.
pub fn execute(config: &Config, moves: &[PlannedMove]) -> Result<RunSummary> {
    let mut summary = RunSummary::new("Organize");
    if moves.is_empty() {
        return Ok(summary);
    }

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let archive = config.root.join(format!("ARCHIVE_{}", stamp));

    for name in CANONICAL_DIRS {
        let dir = config.root.join(name);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    for m in moves {
        let rel = m.source.strip_prefix(&config.root).unwrap_or(&m.source).to_path_buf();
        let outcome = Outcome::from_result(move_one(m, &archive));
        summary.record("Moved", &rel, outcome);
    }
    Ok(summary)
}

fn move_one(m: &PlannedMove, archive: &Path) -> Result<()> {
    let dest = m.destination();
    if dest.is_file() {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
        let backup = super::unique_destination(&archive.join(format!("{}.{}.bak", name, stamp)));
        move_path(&dest, &backup)
            .with_context(|| format!("Failed to back up {}", dest.display()))?;
        println!("  Backed up existing {} -> {}", dest.display(), backup.display());
    }
    move_path(&m.source, &dest)
}
