//! Text manifests of the project.
//!
//! - [`write_source_manifest`]: concatenated text sources (`MANIFEST.txt`)
//! - [`write_diagnostic_report`]: build diagnostics (`manifest.txt`)

use anyhow::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::write_file_with_dirs;
use crate::config::Config;

use super::is_within;

pub const SOURCE_MANIFEST: &str = "MANIFEST.txt";
pub const DIAGNOSTIC_REPORT: &str = "manifest.txt";

/// Directories scanned for the source manifest, non-recursively.
const SOURCE_DIRS: [&str; 3] = [".", "assets", "guides"];
const SOURCE_EXTENSIONS: [&str; 8] = [".py", ".sh", ".c", ".s", ".yaml", ".txt", ".md", ".json"];
const SOURCE_EXACT: [&str; 3] = ["Makefile_optimized", "requirements.txt", "Dockerfile"];

/// Directories the diagnostic walk never enters.
const REPORT_IGNORE_DIRS: [&str; 7] =
    [".git", ".build", "chroot", "binary", "cache", "__pycache__", "local"];
/// Extensions whose contents are dumped into the report.
const CRITICAL_EXTENSIONS: [&str; 6] = ["sh", "yaml", "list", "chroot", "hook", "py"];
/// Files larger than this are listed but never read.
const MAX_SCAN_BYTES: u64 = 1024 * 1024;
const LOG_TAIL_LINES: usize = 20;
const RULE: &str = "============================================================";

pub const DEFAULT_WATCH_PACKAGE: &str = "fastfetch";

fn include_in_source(name: &str) -> bool {
    if SOURCE_EXACT.contains(&name) {
        return true;
    }
    !name.starts_with("MANIFEST") && SOURCE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Write `MANIFEST.txt`. Returns its path and the number of files included.
pub fn write_source_manifest(config: &Config) -> Result<(PathBuf, usize)> {
    let mut out = String::from("FurryOS Source Manifest\n=======================\n\n");
    let mut total = 0;
    let fence = "-".repeat(40);

    for dir in SOURCE_DIRS {
        let path = if dir == "." {
            config.root.clone()
        } else {
            config.root.join(dir)
        };
        let Ok(entries) = fs::read_dir(&path) else {
            println!("  [SKIP] {}/ not found", dir);
            continue;
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(include_in_source)
            })
            .collect();
        files.sort();

        for file in files {
            let rel = file.strip_prefix(&config.root).unwrap_or(&file).display().to_string();
            let content = match fs::read(&file) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    println!("  [WARN] Could not read {}: {}", rel, e);
                    continue;
                }
            };

            let _ = writeln!(out, "FILE_START: {}", rel);
            let _ = writeln!(out, "{}", fence);
            out.push_str(&content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", fence);
            let _ = writeln!(out, "FILE_END: {}\n", rel);
            tracing::debug!("manifest: added {}", rel);
            total += 1;
        }
    }

    let dest = config.root.join(SOURCE_MANIFEST);
    write_file_with_dirs(&dest, out)?;
    Ok((dest, total))
}

/// Result of a diagnostic report run.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub path: PathBuf,
    pub isos: Vec<(PathBuf, u64)>,
    pub watch_package: String,
    pub watch_hits: Vec<PathBuf>,
}

/// Write `manifest.txt`: ISO search, build log tail, annotated tree, and
/// the files that still mention `watch`.
pub fn write_diagnostic_report(config: &Config, watch: &str) -> Result<DiagnosticReport> {
    let root = &config.root;
    let mut out = String::new();
    let _ = writeln!(out, "FURRYOS PROJECT MANIFEST");
    let _ = writeln!(out, "Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{}\n", RULE);

    out.push_str("--- ISO SEARCH ---\n");
    let isos = find_isos(root, &config.artifact_dir);
    if isos.is_empty() {
        out.push_str("NO ISO FILES FOUND.\n");
    }
    for (path, size) in &isos {
        let _ = writeln!(
            out,
            "[FOUND ISO] {} ({:.2} MB)",
            path.display(),
            *size as f64 / (1024.0 * 1024.0)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "--- BUILD LOG DIAGNOSIS (Last {} lines) ---", LOG_TAIL_LINES);
    out.push_str(&build_log_tail(&root.join("build.log")));
    let _ = writeln!(out, "\n{}\n", RULE);

    out.push_str("--- FILE STRUCTURE & CRITICAL CONTENT ---\n");
    let watch_hits = annotated_tree(root, &config.artifact_dir, watch, &mut out);

    let _ = writeln!(out, "\n{}", RULE);
    out.push_str("DIAGNOSTIC SUMMARY:\n");
    if watch_hits.is_empty() {
        let _ = writeln!(out, "CLEAN: No '{}' found.", watch);
    } else {
        let _ = writeln!(
            out,
            "CRITICAL: Found {} files still containing '{}'. This WILL break the build.",
            watch_hits.len(),
            watch
        );
    }

    let path = root.join(DIAGNOSTIC_REPORT);
    write_file_with_dirs(&path, out)?;
    Ok(DiagnosticReport {
        path,
        isos,
        watch_package: watch.to_string(),
        watch_hits,
    })
}

fn find_isos(root: &Path, artifact_dir: &Path) -> Vec<(PathBuf, u64)> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git" && !is_within(e.path(), artifact_dir))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == "iso"))
        .map(|e| {
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            (e.into_path(), size)
        })
        .collect()
}

fn build_log_tail(log: &Path) -> String {
    if !log.exists() {
        return "build.log does not exist.\n".to_string();
    }
    match fs::read(log) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let lines: Vec<&str> = text.lines().collect();
            let start = lines.len().saturating_sub(LOG_TAIL_LINES);
            let mut tail = lines[start..].join("\n");
            tail.push('\n');
            tail
        }
        Err(_) => "Could not read build.log\n".to_string(),
    }
}

fn read_small(path: &Path) -> Option<String> {
    let meta = fs::metadata(path).ok()?;
    if meta.len() > MAX_SCAN_BYTES {
        return None;
    }
    fs::read(path)
        .ok()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn is_critical(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == "build.sh")
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CRITICAL_EXTENSIONS.contains(&e))
}

fn annotated_tree(root: &Path, artifact_dir: &Path, watch: &str, out: &mut String) -> Vec<PathBuf> {
    let mut hits = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by(|a, b| {
            // Files before subdirectories, each group by name
            let key = |e: &walkdir::DirEntry| (e.file_type().is_dir(), e.file_name().to_os_string());
            key(a).cmp(&key(b))
        })
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.depth() > 0
                && (REPORT_IGNORE_DIRS.iter().any(|d| e.file_name() == *d)
                    || is_within(e.path(), artifact_dir)))
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            let indent = " ".repeat(4 * entry.depth());
            let _ = writeln!(out, "{}[DIR] {}/", indent, name);
            continue;
        }

        let indent = " ".repeat(4 * entry.depth());
        let content = read_small(entry.path());
        if let Some(text) = &content {
            if !watch.is_empty() && text.contains(watch) {
                let _ = writeln!(out, "{}WARNING: '{}' found in {}", indent, watch, name);
                hits.push(entry.path().to_path_buf());
            }
        }
        let _ = writeln!(out, "{}{}", indent, name);

        if is_critical(entry.path()) {
            let _ = writeln!(out, "{}    --- CONTENT START ---", indent);
            match &content {
                Some(text) => {
                    for line in text.lines() {
                        let _ = writeln!(out, "{}    | {}", indent, line);
                    }
                }
                None => {
                    let _ = writeln!(out, "{}    | [unreadable or larger than 1 MiB]", indent);
                }
            }
            let _ = writeln!(out, "{}    --- CONTENT END ---", indent);
        }
    }
    hits
}
