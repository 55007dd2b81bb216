//! File writing, copying and moving helpers.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

/// Mode for generated scripts.
pub const MODE_EXEC: u32 = 0o755;
/// Mode for generated data files.
pub const MODE_DATA: u32 = 0o644;
/// Mode for private key material.
pub const MODE_SECRET: u32 = 0o600;

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write a file and set its Unix mode, creating parent directories.
///
/// The mode is applied after writing, so an existing file with looser
/// permissions is tightened too.
pub fn write_file_mode<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
    mode: u32,
) -> Result<()> {
    let path = path.as_ref();
    write_file_with_dirs(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to chmod {:o} {}", mode, path.display()))?;
    Ok(())
}

/// Move a file or directory, creating the destination's parent.
///
/// Falls back to copy-then-delete when `rename` fails (the artifact store
/// is often on another filesystem).
pub fn move_path(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let meta = fs::symlink_metadata(src)
        .with_context(|| format!("Cannot stat {}", src.display()))?;
    if meta.is_dir() {
        copy_dir_recursive(src, dst)?;
        fs::remove_dir_all(src)
            .with_context(|| format!("Copied but failed to remove {}", src.display()))?;
    } else {
        fs::copy(src, dst).with_context(|| {
            format!("Failed to copy {} -> {}", src.display(), dst.display())
        })?;
        fs::remove_file(src)
            .with_context(|| format!("Copied but failed to remove {}", src.display()))?;
    }
    Ok(())
}

/// Remove a file or a directory tree.
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("Cannot stat {}", path.display()))?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("Failed to remove {}", path.display()))
}

/// Recursively copy `src` into `dst`, preserving relative structure.
///
/// Symlinks are recreated rather than followed. Returns the number of files
/// copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<usize> {
    copy_dir_filtered(src, dst, |_| true)
}

/// Like [`copy_dir_recursive`], but entries for which `keep` returns false
/// (given the path relative to `src`) are skipped along with their
/// contents.
pub fn copy_dir_filtered<F>(src: &Path, dst: &Path, keep: F) -> Result<usize>
where
    F: Fn(&Path) -> bool,
{
    if !src.is_dir() {
        bail!("{} is not a directory", src.display());
    }
    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

    let mut copied = 0;
    let walker = WalkDir::new(src).min_depth(1).into_iter().filter_entry(|e| {
        e.path()
            .strip_prefix(src)
            .map(|rel| keep(rel))
            .unwrap_or(false)
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.exists() || target.is_symlink() {
                fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("Failed to link {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} -> {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Whether a file has any execute bit set.
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_file_mode_sets_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/run.sh");

        write_file_mode(&path, "#!/bin/sh\n", MODE_EXEC).unwrap();
        assert!(is_executable(&path));

        write_file_mode(&path, "data\n", MODE_DATA).unwrap();
        assert!(!is_executable(&path));
        assert_eq!(fs::read_to_string(&path).unwrap(), "data\n");
    }

    #[test]
    fn test_move_path_creates_parent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("cache");
        fs::create_dir_all(src.join("deep")).unwrap();
        fs::write(src.join("deep/x.bin"), "x").unwrap();

        let dst = dir.path().join("store/nested/cache");
        move_path(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("deep/x.bin")).unwrap(), "x");
    }

    #[test]
    fn test_copy_dir_filtered_skips_subtrees() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("keep")).unwrap();
        fs::create_dir_all(src.join("venv/lib")).unwrap();
        fs::write(src.join("keep/a.txt"), "a").unwrap();
        fs::write(src.join("venv/lib/b.txt"), "b").unwrap();

        let dst = dir.path().join("dst");
        let copied = copy_dir_filtered(&src, &dst, |rel| !rel.starts_with("venv")).unwrap();

        assert_eq!(copied, 1);
        assert!(dst.join("keep/a.txt").exists());
        assert!(!dst.join("venv").exists());
    }
}
