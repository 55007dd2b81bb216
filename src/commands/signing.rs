//! Keys, release and timestamp commands.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{write_file_mode, MODE_DATA};
use crate::config::Config;
use crate::genome::Genome;
use crate::signing::timestamp::{NTP_TIMEOUT, TIMESTAMP_FILE};
use crate::signing::{self, CreateOptions, KeyPaths, TimeSource};

/// Release operation.
pub enum ReleaseAction {
    Create {
        file: PathBuf,
        sequence: u64,
        previous: Option<PathBuf>,
    },
    Verify {
        manifest: PathBuf,
        file: Option<PathBuf>,
    },
    /// Detached signatures for `furryos_build/bin/*`
    SignBins,
}

fn resolve(config: &Config, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        config.root.join(path)
    }
}

/// Execute `keys generate`.
pub fn cmd_keys_generate(config: &Config, force: bool) -> Result<()> {
    println!("Generating Ed25519 keypair...");
    let paths = signing::write_new_keypair(&config.signing_key_dir, force)?;
    println!("  Private key: {} (0600, keep secret)", paths.private.display());
    println!("  Public key:  {} (0644, distribute)", paths.public.display());
    println!("  Notes:       {}", paths.readme.display());
    Ok(())
}

fn release_metadata(genome: &Genome) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("author".to_string(), genome.author.clone()),
        ("organization".to_string(), genome.company.clone()),
        ("os_name".to_string(), genome.os_name.clone()),
        ("version".to_string(), genome.version.clone()),
        ("codename".to_string(), genome.codename.clone()),
    ])
}

/// Execute a release command.
pub fn cmd_release(config: &Config, action: ReleaseAction) -> Result<()> {
    match action {
        ReleaseAction::Create {
            file,
            sequence,
            previous,
        } => {
            let file = resolve(config, file);
            let keys = KeyPaths::in_dir(&config.signing_key_dir);
            let key = signing::load_signing_key(&keys.private)?;
            let genome = Genome::load(config);
            let claim = signing::claim_time(config.ntp_server.as_deref(), NTP_TIMEOUT);

            let mut metadata = release_metadata(&genome);
            metadata.insert("time_source".to_string(), time_source_label(&claim.source));
            let options = CreateOptions {
                sequence,
                previous: previous.map(|p| resolve(config, p)),
                metadata,
                timestamp: Some(claim.time),
            };
            let manifest = signing::create(&file, &key, &options)?;
            let out = signing::manifest_path_for(&file);
            signing::write_manifest(&out, &manifest)?;

            println!("Wrote {}", out.display());
            println!("  Sequence: {}", manifest.sequence);
            println!("  Time:     {}", manifest.timestamp_claim);
            println!("  SHA-256:  {}", manifest.file_info.hashes.sha256);
            println!("  Signed by {}", manifest.identity.public_key);
        }
        ReleaseAction::Verify { manifest, file } => {
            let manifest_path = resolve(config, manifest);
            let manifest = signing::read_manifest(&manifest_path)?;
            let file = match file {
                Some(f) => resolve(config, f),
                None => default_release_file(&manifest_path, &manifest.file_info.filename)?,
            };

            let local = KeyPaths::in_dir(&config.signing_key_dir).public;
            let local_key = if local.exists() {
                Some(signing::load_verifying_key(&local)?)
            } else {
                None
            };

            let result = signing::verify(&manifest, &file, local_key.as_ref())?;
            println!("Signature valid and hashes match for {}", result.file.display());
            match result.matches_local_key {
                Some(true) => println!("  Signed by the local key in {}", local.display()),
                Some(false) => println!(
                    "  [WARN] Signed by {}, which is NOT the local key",
                    result.public_key
                ),
                None => println!("  [SKIP] No local public key to compare against"),
            }
        }
        ReleaseAction::SignBins => {
            let keys = KeyPaths::in_dir(&config.signing_key_dir);
            let key = signing::load_signing_key(&keys.private)?;
            let bin_dir = config.build_dir.join("bin");
            println!("Signing binaries in {}", bin_dir.display());
            let summary = signing::sign_binaries(&bin_dir, &key);
            summary.print();
        }
    }
    Ok(())
}

fn time_source_label(source: &TimeSource) -> String {
    match source {
        TimeSource::Ntp(reading) => format!("ntp:{}", reading.server),
        TimeSource::System { .. } => "system".to_string(),
    }
}

/// Execute `timestamp`: write a time claim to `TIMESTAMP.txt` (or `output`).
pub fn cmd_timestamp(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let out = resolve(config, output.unwrap_or_else(|| PathBuf::from(TIMESTAMP_FILE)));
    match &config.ntp_server {
        Some(server) => println!("Querying {} ...", server),
        None => println!("NTP disabled, using the system clock"),
    }
    let claim = signing::claim_time(config.ntp_server.as_deref(), NTP_TIMEOUT);
    write_file_mode(&out, claim.report(), MODE_DATA)?;

    println!("Wrote {}", out.display());
    println!("  Time:   {}", claim.rfc3339());
    println!(
        "  Source: {}",
        if claim.is_ntp() { "NTP" } else { "system clock" }
    );
    Ok(())
}

/// The released file sits next to its manifest. Only the final component
/// of the recorded name is used.
fn default_release_file(manifest_path: &Path, filename: &str) -> Result<PathBuf> {
    let dir = manifest_path
        .parent()
        .with_context(|| format!("{} has no parent directory", manifest_path.display()))?;
    let name = Path::new(filename)
        .file_name()
        .filter(|name| name.len() == filename.len())
        .with_context(|| {
            format!(
                "Manifest file name {:?} is not a plain file name; pass --file",
                filename
            )
        })?;
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_release_file_stays_beside_manifest() {
        let manifest = Path::new("/srv/releases/a.iso.release.json");
        assert_eq!(
            default_release_file(manifest, "a.iso").unwrap(),
            PathBuf::from("/srv/releases/a.iso")
        );
        for bad in ["../etc/shadow", "/etc/shadow", "sub/a.iso", "..", ""] {
            assert!(default_release_file(manifest, bad).is_err(), "{:?}", bad);
        }
    }
}
