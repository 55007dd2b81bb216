//! Manifest and tree commands.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::housekeeping::{manifest, tree};

/// Which listing to produce.
pub enum ManifestTarget {
    /// Concatenated text sources (MANIFEST.txt)
    Source,
    /// Build diagnostics (manifest.txt)
    Report { watch: String },
    /// Size-annotated tree of a directory
    Tree { dir: Option<PathBuf> },
}

/// Execute the manifest command.
pub fn cmd_manifest(config: &Config, target: ManifestTarget) -> Result<()> {
    match target {
        ManifestTarget::Source => {
            let (path, count) = manifest::write_source_manifest(config)?;
            println!("Wrote {} ({} files)", path.display(), count);
        }
        ManifestTarget::Report { watch } => {
            let report = manifest::write_diagnostic_report(config, &watch)?;
            println!("Wrote {}", report.path.display());
            println!("  ISO files found: {}", report.isos.len());
            if report.watch_hits.is_empty() {
                println!("  No files mention '{}'.", report.watch_package);
            } else {
                println!(
                    "  [WARN] {} file(s) still mention '{}':",
                    report.watch_hits.len(),
                    report.watch_package
                );
                for hit in &report.watch_hits {
                    let rel = hit.strip_prefix(&config.root).unwrap_or(hit);
                    println!("    {}", rel.display());
                }
            }
        }
        ManifestTarget::Tree { dir } => {
            let dir = match dir {
                Some(d) if d.is_absolute() => d,
                Some(d) => config.root.join(d),
                None => config.root.clone(),
            };
            let report = tree::render_tree(&dir)?;
            print!("{}", report.text);
        }
    }
    Ok(())
}
