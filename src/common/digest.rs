//! Streaming file digests.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// SHA-256 and SHA-512 of one file, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashes {
    pub sha256: String,
    pub sha512: String,
    pub size: u64,
}

/// Hash a file in one pass, feeding both digests.
pub fn hash_file(path: &Path) -> Result<FileHashes> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut sha256 = Sha256::new();
    let mut sha512 = Sha512::new();
    let mut size = 0u64;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        sha512.update(&buf[..n]);
        size += n as u64;
    }

    Ok(FileHashes {
        sha256: format!("{:x}", sha256.finalize()),
        sha512: format!("{:x}", sha512.finalize()),
        size,
    })
}

/// One `sha256sum`-compatible line: `<hex>  <name>`.
pub fn sha256sum_line(hashes: &FileHashes, file_name: &str) -> String {
    format!("{}  {}\n", hashes.sha256, file_name)
}
