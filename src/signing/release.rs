//! Signed release manifests.
//!
//! A manifest records a file's size and digests and an Ed25519 signature
//! over the lowercase SHA-512 hex string. Manifests chain through
//! `previous_record`, the SHA-256 of the prior manifest file.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{hash_file, write_file_with_dirs};

pub const MANIFEST_VERSION: &str = "1.0";
pub const ALGORITHM: &str = "Ed25519";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashes {
    pub sha256: String,
    pub sha512: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub hashes: Hashes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Raw 32-byte public key, hex.
    pub public_key: String,
    pub signature_of_sha512: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub manifest_version: String,
    pub sequence: u64,
    pub previous_record: Option<String>,
    pub timestamp_claim: String,
    pub file_info: FileInfo,
    pub identity: Identity,
    pub metadata: BTreeMap<String, String>,
}

/// Manifest path for a released file: `<file>.release.json`.
pub fn manifest_path_for(file: &Path) -> PathBuf {
    let mut name = file.file_name().unwrap_or_default().to_os_string();
    name.push(".release.json");
    file.with_file_name(name)
}

/// Options for [`create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub sequence: u64,
    /// Prior manifest in the chain.
    pub previous: Option<PathBuf>,
    pub metadata: BTreeMap<String, String>,
    /// Fixed timestamp instead of now.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Hash and sign `file`.
pub fn create(file: &Path, key: &SigningKey, options: &CreateOptions) -> Result<ReleaseManifest> {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", file.display()))?;

    println!("Hashing {} (SHA-256 and SHA-512)...", file.display());
    let hashes = hash_file(file)?;

    let previous_record = match &options.previous {
        Some(prev) => {
            // Must itself be a manifest
            read_manifest(prev)?;
            Some(hash_file(prev)?.sha256)
        }
        None => None,
    };

    if options.sequence > 0 && previous_record.is_none() {
        println!("  [WARN] Sequence {} has no previous record", options.sequence);
    }

    let signature = key.sign(hashes.sha512.as_bytes());
    let timestamp = options.timestamp.unwrap_or_else(Utc::now);

    Ok(ReleaseManifest {
        manifest_version: MANIFEST_VERSION.to_string(),
        sequence: options.sequence,
        previous_record,
        timestamp_claim: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        file_info: FileInfo {
            filename,
            size_bytes: hashes.size,
            hashes: Hashes {
                sha256: hashes.sha256,
                sha512: hashes.sha512,
            },
        },
        identity: Identity {
            public_key: hex::encode(key.verifying_key().to_bytes()),
            signature_of_sha512: hex::encode(signature.to_bytes()),
            algorithm: ALGORITHM.to_string(),
        },
        metadata: options.metadata.clone(),
    })
}

pub fn write_manifest(path: &Path, manifest: &ReleaseManifest) -> Result<()> {
    let mut json = serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    json.push('\n');
    write_file_with_dirs(path, json)
}

pub fn read_manifest(path: &Path) -> Result<ReleaseManifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read manifest {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// What [`verify`] checked.
#[derive(Debug, Clone)]
pub struct Verification {
    pub file: PathBuf,
    pub public_key: String,
    /// Whether the manifest key equals the local public key, when one exists.
    pub matches_local_key: Option<bool>,
}

fn decode_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(hex_key)
        .context("Public key is not valid hex")?
        .try_into()
        .map_err(|_| anyhow!("Public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| anyhow!("Invalid public key: {}", e))
}

/// Check the signature and recompute the file's size and digests.
pub fn verify(
    manifest: &ReleaseManifest,
    file: &Path,
    local_key: Option<&VerifyingKey>,
) -> Result<Verification> {
    if manifest.identity.algorithm != ALGORITHM {
        bail!("Unsupported signature algorithm: {}", manifest.identity.algorithm);
    }

    let key = decode_public_key(&manifest.identity.public_key)?;
    let sig_bytes = hex::decode(&manifest.identity.signature_of_sha512)
        .context("Signature is not valid hex")?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|e| anyhow!("Malformed signature: {}", e))?;
    key.verify(manifest.file_info.hashes.sha512.as_bytes(), &signature)
        .map_err(|_| anyhow!("Signature does not match the recorded SHA-512"))?;

    let actual = hash_file(file)?;
    let recorded = &manifest.file_info;
    if actual.size != recorded.size_bytes {
        bail!(
            "Size mismatch for {}: manifest says {} bytes, file has {}",
            file.display(),
            recorded.size_bytes,
            actual.size
        );
    }
    if actual.sha256 != recorded.hashes.sha256 {
        bail!("SHA-256 mismatch for {}", file.display());
    }
    if actual.sha512 != recorded.hashes.sha512 {
        bail!("SHA-512 mismatch for {}", file.display());
    }

    Ok(Verification {
        file: file.to_path_buf(),
        public_key: manifest.identity.public_key.clone(),
        matches_local_key: local_key.map(|k| *k == key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn test_manifest_path_for() {
        assert_eq!(
            manifest_path_for(Path::new("output/furryos-8.1.0-x86_64.iso")),
            PathBuf::from("output/furryos-8.1.0-x86_64.iso.release.json")
        );
    }

    #[test]
    fn test_create_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("abc.iso");
        fs::write(&file, "abc").unwrap();

        let options = CreateOptions {
            timestamp: DateTime::parse_from_rfc3339("2025-12-25T00:00:00Z")
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            ..Default::default()
        };
        let manifest = create(&file, &key(), &options).unwrap();

        assert_eq!(manifest.manifest_version, "1.0");
        assert_eq!(manifest.sequence, 0);
        assert_eq!(manifest.previous_record, None);
        assert_eq!(manifest.timestamp_claim, "2025-12-25T00:00:00Z");
        assert_eq!(manifest.file_info.filename, "abc.iso");
        assert_eq!(manifest.file_info.size_bytes, 3);
        assert_eq!(
            manifest.file_info.hashes.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(manifest.identity.algorithm, "Ed25519");
        assert_eq!(manifest.identity.signature_of_sha512.len(), 128);

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json["previous_record"].is_null());
        assert!(json["file_info"]["hashes"]["sha512"].is_string());
    }

    #[test]
    fn test_verify_detects_tampering() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("release.bin");
        fs::write(&file, "original bytes").unwrap();

        let manifest = create(&file, &key(), &CreateOptions::default()).unwrap();
        let local = key().verifying_key();
        let ok = verify(&manifest, &file, Some(&local)).unwrap();
        assert_eq!(ok.matches_local_key, Some(true));

        fs::write(&file, "modified bytes").unwrap();
        assert!(verify(&manifest, &file, None).is_err());

        fs::write(&file, "original bytes").unwrap();
        let mut forged = manifest.clone();
        forged.file_info.hashes.sha512 = "0".repeat(128);
        assert!(verify(&forged, &file, None).is_err());
    }

    #[test]
    fn test_previous_record_is_hash_of_prior_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.iso");
        fs::write(&file, "one").unwrap();

        let genesis = create(&file, &key(), &CreateOptions::default()).unwrap();
        let genesis_path = manifest_path_for(&file);
        write_manifest(&genesis_path, &genesis).unwrap();

        let next = create(
            &file,
            &key(),
            &CreateOptions {
                sequence: 1,
                previous: Some(genesis_path.clone()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            next.previous_record,
            Some(hash_file(&genesis_path).unwrap().sha256)
        );
        assert_eq!(read_manifest(&genesis_path).unwrap(), genesis);
    }
}
