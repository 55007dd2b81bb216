//! Detached signatures for the compiled helper binaries.
//!
//! Each file in `furryos_build/bin/` gets a `<file>.sig` holding the raw
//! 64-byte Ed25519 signature over the file's bytes.

use anyhow::{anyhow, Context, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{write_file_mode, MODE_DATA};
use crate::report::{Outcome, RunSummary};

pub const SIGNATURE_EXT: &str = "sig";

/// `<file>.sig`
pub fn signature_path_for(file: &Path) -> PathBuf {
    let mut name = file.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(SIGNATURE_EXT);
    file.with_file_name(name)
}

fn is_signature(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SIGNATURE_EXT)
}

/// Regular files in `bin_dir` that are not signatures themselves, sorted.
pub fn binaries_in(bin_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(bin_dir)
        .with_context(|| format!("Cannot read {}", bin_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_signature(p))
        .collect();
    files.sort();
    Ok(files)
}

pub fn sign_file(file: &Path, key: &SigningKey) -> Result<PathBuf> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let signature = key.sign(&data);
    let sig_path = signature_path_for(file);
    write_file_mode(&sig_path, signature.to_bytes(), MODE_DATA)?;
    Ok(sig_path)
}

pub fn verify_file(file: &Path, key: &VerifyingKey) -> Result<()> {
    let sig_path = signature_path_for(file);
    let raw = fs::read(&sig_path)
        .with_context(|| format!("Failed to read {}", sig_path.display()))?;
    let signature = Signature::from_slice(&raw)
        .map_err(|e| anyhow!("Malformed signature {}: {}", sig_path.display(), e))?;
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    key.verify(&data, &signature)
        .map_err(|_| anyhow!("Signature does not match {}", file.display()))
}

/// Sign every binary in `bin_dir`. A file that cannot be signed is
/// recorded as failed and the rest are still signed.
pub fn sign_binaries(bin_dir: &Path, key: &SigningKey) -> RunSummary {
    let mut summary = RunSummary::new("Sign binaries");
    if !bin_dir.is_dir() {
        summary.record("Sign", bin_dir, Outcome::Skipped("no binaries built".into()));
        return summary;
    }

    match binaries_in(bin_dir) {
        Ok(files) if files.is_empty() => {
            summary.record("Sign", bin_dir, Outcome::Skipped("directory is empty".into()));
        }
        Ok(files) => {
            for file in files {
                let result = sign_file(&file, key);
                summary.record("Signed", &file, Outcome::from_result(result));
            }
        }
        Err(e) => summary.record("Sign", bin_dir, Outcome::Failed(format!("{:#}", e))),
    }
    summary
}
