//! Size-annotated directory tree.
//!
//! Subdirectories below the top level that hold more than
//! [`COLLAPSE_THRESHOLD`] files are shown as a single summary line.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const COLLAPSE_THRESHOLD: usize = 100;

const UNITS: [&str; 6] = ["B", "K", "M", "G", "T", "P"];

/// Human-readable size with whole-number precision: `512B`, `4K`, `2G`.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.0}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.0}E", size)
}

/// Rendered tree plus its totals.
#[derive(Debug, Clone)]
pub struct TreeReport {
    pub text: String,
    pub total_bytes: u64,
    pub dirs: usize,
    pub files: usize,
}

/// One scanned entry. Directory totals cover everything beneath them.
#[derive(Debug)]
struct Node {
    name: String,
    is_dir: bool,
    bytes: u64,
    files: usize,
    children: Vec<Node>,
}

impl Node {
    fn file(name: String, bytes: u64) -> Self {
        Self {
            name,
            is_dir: false,
            bytes,
            files: 1,
            children: Vec::new(),
        }
    }
}

/// Read `dir` once, totalling each directory from its children on the way
/// back up.
fn scan(dir: &Path, name: String) -> Node {
    let mut node = Node {
        name,
        is_dir: true,
        bytes: 0,
        files: 0,
        children: Vec::new(),
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return node;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let child = if is_dir {
            scan(&entry.path(), name)
        } else {
            Node::file(name, entry.metadata().map(|m| m.len()).unwrap_or(0))
        };
        node.bytes += child.bytes;
        node.files += child.files;
        node.children.push(child);
    }
    // Directories first, then by name
    node.children
        .sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    node
}

fn render_dir(dir: &Node, prefix: &str, depth: usize, report: &mut TreeReport) {
    let count = dir.children.len();

    for (i, child) in dir.children.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { "└── " } else { "├── " };
        let size = human_size(child.bytes);

        if !child.is_dir {
            report.files += 1;
            report.total_bytes += child.bytes;
            let _ = writeln!(report.text, "{}{}[{:>5}] {}", prefix, connector, size, child.name);
            continue;
        }

        report.dirs += 1;
        if depth > 0 && child.files > COLLAPSE_THRESHOLD {
            report.files += child.files;
            report.total_bytes += child.bytes;
            let _ = writeln!(
                report.text,
                "{}{}[{:>5}] {}/   (Collapsed: {} files)",
                prefix, connector, size, child.name, child.files
            );
            continue;
        }

        let _ = writeln!(report.text, "{}{}[{:>5}] {}/", prefix, connector, size, child.name);
        let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_dir(child, &next, depth + 1, report);
    }
}

/// Render the tree rooted at `dir`.
pub fn render_tree(dir: &Path) -> Result<TreeReport> {
    let root = fs::canonicalize(dir).with_context(|| format!("Cannot open {}", dir.display()))?;
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let mut report = TreeReport {
        text: format!("[{}]\n", root.display()),
        total_bytes: 0,
        dirs: 0,
        files: 0,
    };
    let tree = scan(&root, root.display().to_string());
    render_dir(&tree, "", 0, &mut report);

    let _ = writeln!(report.text, "{}", "-".repeat(40));
    let _ = writeln!(
        report.text,
        "Total: {} used in {} directories, {} files",
        human_size(report.total_bytes),
        report.dirs,
        report.files
    );
    Ok(report)
}
