//! Artifact generation from the genome.
//!
//! Every artifact is rendered in memory first, then written in full,
//! clobbering the previous copy. Nothing is written if any template fails to
//! render.

pub mod desktop;
pub mod packages;
pub mod scripts;
pub mod template;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::common::{write_file_mode, MODE_DATA, MODE_EXEC};
use crate::config::Config;
use crate::genome::Genome;

pub use template::{render, Vars};

/// File name of the user guide inside the ISO and the user's Documents.
pub const GUIDE_NAME: &str = "FurryOS_User_Guide.pdf";

/// A generated file: destination relative to the project root, full
/// content, and whether it is executable.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    pub executable: bool,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: String, executable: bool) -> Self {
        Self {
            path: path.into(),
            content,
            executable,
        }
    }

    pub fn mode(&self) -> u32 {
        if self.executable {
            MODE_EXEC
        } else {
            MODE_DATA
        }
    }

    /// Write under `root`, creating parents and applying the mode.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let dest = root.join(&self.path);
        write_file_mode(&dest, &self.content, self.mode())?;
        tracing::debug!("wrote {} ({:o})", dest.display(), self.mode());
        Ok(dest)
    }
}

/// Write a batch of artifacts, printing each destination.
pub fn write_all(root: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let dest = artifact.write(root)?;
        println!(
            "  Wrote {}{}",
            artifact.path.display(),
            if artifact.executable { " (exec)" } else { "" }
        );
        written.push(dest);
    }
    Ok(written)
}

/// Substitution values shared by every template.
///
/// Quoting specials are escaped at render time. Line breaks cannot be
/// escaped inside a comment or a `sed` line, so control characters are
/// rejected.
pub fn base_vars(genome: &Genome, config: &Config) -> Result<Vars> {
    if !is_valid_username(&genome.username) {
        bail!(
            "Invalid username '{}' in user profile (expected lowercase letters, digits, '-' or '_', starting with a letter or '_')",
            genome.username
        );
    }

    let content_name = config
        .content_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| crate::config::DEFAULT_CONTENT_DIR.to_string());

    let mut vars = Vars::new();
    vars.insert("OS_NAME", genome.os_name.clone());
    vars.insert("VERSION", genome.version.clone());
    vars.insert("CODENAME", genome.codename.clone());
    vars.insert("AUTHOR", genome.author.clone());
    vars.insert("COMPANY", genome.company.clone());
    vars.insert("DEBIAN_RELEASE", genome.debian_release.clone());
    vars.insert("ARCH", genome.arch.clone());
    vars.insert("USERNAME", genome.username.clone());
    vars.insert("FULLNAME", genome.fullname.clone());
    vars.insert("CONTENT_NAME", content_name);
    vars.insert("GUIDE_NAME", GUIDE_NAME.to_string());
    vars.insert(
        "GENERATED",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    for (key, value) in &vars {
        if let Some(bad) = value.chars().find(|c| c.is_control()) {
            bail!(
                "Value for {} contains {:?}, which cannot be embedded in generated scripts: {:?}",
                key,
                bad,
                value
            );
        }
    }

    Ok(vars)
}

/// Debian `adduser` default NAME_REGEX, minus the trailing `$`.
fn is_valid_username(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 32
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
