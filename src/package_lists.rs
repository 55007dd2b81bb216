//! Package-list mutation and auditing.
//!
//! Operates on every `*.list.chroot` and `*.list` file under `config/`.
//! Removal matches by substring on the trimmed line, so removing `vim`
//! also drops `vim-tiny`. Adding matches whole lines.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::report::{Outcome, RunSummary};

/// Outcome of an add or remove over all lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Lists that were rewritten.
    Modified(Vec<PathBuf>),
    NotPresent,
    AlreadyPresent,
    NoListFiles,
}

impl Mutation {
    pub fn modified_count(&self) -> usize {
        match self {
            Mutation::Modified(files) => files.len(),
            _ => 0,
        }
    }
}

pub fn is_list_file(name: &str) -> bool {
    name.ends_with(".list.chroot") || name.ends_with(".list")
}

/// All package lists under `config_dir`, sorted.
pub fn find_lists(config_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(config_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_list_file(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

fn read_list(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_list(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Trimmed package name; empty names would match every line.
fn package_name(package: &str) -> Result<&str> {
    let package = package.trim();
    if package.is_empty() {
        bail!("Package name is empty");
    }
    Ok(package)
}

/// Remove every line mentioning `package` from every list.
///
/// Lists that cannot be read or rewritten are recorded as failures in
/// `summary` and the remaining lists are still processed.
pub fn remove(config: &Config, package: &str, summary: &mut RunSummary) -> Result<Mutation> {
    let package = package_name(package)?;
    let lists = find_lists(&config.config_dir);
    if lists.is_empty() {
        return Ok(Mutation::NoListFiles);
    }

    let mut modified = Vec::new();
    for path in lists {
        let text = match read_list(&path) {
            Ok(text) => text,
            Err(e) => {
                summary.record("Read", &path, Outcome::Failed(format!("{:#}", e)));
                continue;
            }
        };

        let kept: Vec<&str> = text
            .split_inclusive('\n')
            .filter(|line| !line.trim().contains(package))
            .collect();
        if kept.len() == text.split_inclusive('\n').count() {
            continue;
        }

        if let Err(e) = write_list(&path, &kept.concat()) {
            summary.record("Rewrite", &path, Outcome::Failed(format!("{:#}", e)));
            continue;
        }
        tracing::debug!("removed '{}' from {}", package, path.display());
        modified.push(path);
    }

    Ok(if modified.is_empty() {
        Mutation::NotPresent
    } else {
        Mutation::Modified(modified)
    })
}

/// Append `package` to every list that lacks it as an exact line.
///
/// Failures are recorded in `summary` the same way [`remove`] records them.
pub fn add(config: &Config, package: &str, summary: &mut RunSummary) -> Result<Mutation> {
    let package = package_name(package)?;
    let lists = find_lists(&config.config_dir);
    if lists.is_empty() {
        return Ok(Mutation::NoListFiles);
    }

    let mut modified = Vec::new();
    for path in lists {
        let mut text = match read_list(&path) {
            Ok(text) => text,
            Err(e) => {
                summary.record("Read", &path, Outcome::Failed(format!("{:#}", e)));
                continue;
            }
        };
        if text.lines().any(|line| line.trim() == package) {
            continue;
        }

        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(package);
        text.push('\n');

        if let Err(e) = write_list(&path, &text) {
            summary.record("Rewrite", &path, Outcome::Failed(format!("{:#}", e)));
            continue;
        }
        tracing::debug!("added '{}' to {}", package, path.display());
        modified.push(path);
    }

    Ok(if modified.is_empty() {
        Mutation::AlreadyPresent
    } else {
        Mutation::Modified(modified)
    })
}

/// Packages named by a list file, ignoring `#` comments.
pub fn list_packages(text: &str) -> Vec<&str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .collect()
}

/// Shell words per logical line: `#` comments dropped and lines ending in
/// `\` joined with the next one.
fn shell_lines(text: &str) -> Vec<Vec<&str>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    for raw in text.lines() {
        let line = raw.split('#').next().unwrap_or("").trim_end();
        let (body, continued) = match line.strip_suffix('\\') {
            Some(body) => (body, true),
            None => (line, false),
        };
        current.extend(body.split_whitespace());
        if !continued {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Packages installed by `apt-get install` / `apt install` lines in a hook.
/// Options are skipped; the scan of a command stops at the first `&&`,
/// `||`, `;` or `|`.
pub fn hook_installs(text: &str) -> Vec<&str> {
    let mut packages = Vec::new();
    for tokens in shell_lines(text) {
        let Some(pos) = tokens
            .windows(2)
            .position(|w| (w[0] == "apt-get" || w[0] == "apt") && w[1] == "install")
        else {
            continue;
        };
        for token in &tokens[pos + 2..] {
            if matches!(*token, "&&" | "||" | ";" | "|") {
                break;
            }
            if let Some(last) = token.strip_suffix(';') {
                if !last.is_empty() && !last.starts_with('-') {
                    packages.push(last);
                }
                break;
            }
            if token.starts_with('-') {
                continue;
            }
            packages.push(*token);
        }
    }
    packages
}

/// Inconsistencies between package lists and hooks.
#[derive(Debug, Default, Clone)]
pub struct Audit {
    pub list_files: usize,
    /// Package -> every list naming it, when more than one does.
    pub duplicates: BTreeMap<String, Vec<PathBuf>>,
    /// Package -> hooks that also install it, for listed packages.
    pub hook_overlaps: BTreeMap<String, Vec<PathBuf>>,
}

impl Audit {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.hook_overlaps.is_empty()
    }

    pub fn print(&self, root: &Path) {
        let rel = |p: &PathBuf| p.strip_prefix(root).unwrap_or(p).display().to_string();
        println!("Package list audit ({} lists)", self.list_files);

        for (pkg, lists) in &self.duplicates {
            let names: Vec<_> = lists.iter().map(rel).collect();
            println!("  [WARN] {} is listed in {} files: {}", pkg, lists.len(), names.join(", "));
        }
        for (pkg, hooks) in &self.hook_overlaps {
            let names: Vec<_> = hooks.iter().map(rel).collect();
            println!("  [WARN] {} is listed and also installed by {}", pkg, names.join(", "));
        }
        if self.is_clean() {
            println!("  No inconsistencies found.");
        }
    }
}

pub fn audit(config: &Config) -> Result<Audit> {
    let lists = find_lists(&config.config_dir);
    let mut result = Audit {
        list_files: lists.len(),
        ..Default::default()
    };

    let mut seen: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in &lists {
        let text = read_list(path)?;
        let unique: BTreeSet<&str> = list_packages(&text).into_iter().collect();
        for pkg in unique {
            seen.entry(pkg.to_string()).or_default().push(path.clone());
        }
    }

    let hooks_dir = config.config_dir.join("hooks");
    for entry in WalkDir::new(&hooks_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Ok(text) = fs::read_to_string(entry.path()) else {
            continue;
        };
        for pkg in hook_installs(&text) {
            if seen.contains_key(pkg) {
                let hooks = result.hook_overlaps.entry(pkg.to_string()).or_default();
                if !hooks.iter().any(|h| h == entry.path()) {
                    hooks.push(entry.path().to_path_buf());
                }
            }
        }
    }

    result.duplicates = seen.into_iter().filter(|(_, files)| files.len() > 1).collect();
    Ok(result)
}
