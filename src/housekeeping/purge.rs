//! Purge live-build state and give the project back to its owner.
//!
//! live-build runs as root and leaves root-owned trees behind. This pass
//! runs `lb clean --purge`, deletes what it misses, then recursively chowns
//! the project to the invoking user.

use std::path::Path;

use crate::common::remove_path;
use crate::config::Config;
use crate::process::{self, Cmd};
use crate::report::{Outcome, RunSummary};

/// Directories created by live-build, relative to the project root.
pub const LOCKED_FOLDERS: [&str; 10] = [
    "chroot",
    "binary",
    "cache",
    ".build",
    "local",
    "config/binary",
    "config/bootstrap",
    "config/chroot",
    "config/common",
    "config/source",
];

/// Stray files from previous builds.
pub const FILES_TO_REMOVE: [&str; 3] = [
    "build.log",
    "binary.hybrid.iso",
    "live-image-amd64.hybrid.iso",
];

/// Remove live-build state. Needs no privilege itself; callers ensure root.
pub fn clean_state(config: &Config) -> RunSummary {
    let mut summary = RunSummary::new("Purge");
    let root = &config.root;

    if process::exists("lb") {
        println!("Exec: lb clean --purge");
        let result = Cmd::new("lb")
            .args(["clean", "--purge"])
            .dir(root)
            .error_msg("lb clean --purge failed")
            .run_interactive();
        summary.record("lb clean --purge in", root, Outcome::from_result(result));
    } else {
        summary.record(
            "lb clean --purge in",
            root,
            Outcome::Skipped("live-build not installed".into()),
        );
    }

    let mut cleaned = false;
    for rel in LOCKED_FOLDERS.iter().chain(FILES_TO_REMOVE.iter()) {
        let path = root.join(rel);
        if !path.exists() && !path.is_symlink() {
            continue;
        }
        println!("Removing {}...", rel);
        summary.record("Removed", Path::new(rel), Outcome::from_result(remove_path(&path)));
        cleaned = true;
    }

    if !cleaned {
        println!("No live-build state to remove.");
    }
    summary
}

/// `chown -R user:user` and `chmod -R u+rwX` over the project.
pub fn unlock(config: &Config, user: &str, summary: &mut RunSummary) {
    println!("Unlocking project for user '{}'...", user);
    let root = &config.root;

    let chown = Cmd::new("chown")
        .arg("-R")
        .arg(format!("{}:{}", user, user))
        .arg_path(root)
        .error_msg("chown failed")
        .run();
    summary.record("Reclaimed ownership of", root, Outcome::from_result(chown));

    let chmod = Cmd::new("chmod")
        .args(["-R", "u+rwX"])
        .arg_path(root)
        .error_msg("chmod failed")
        .run();
    summary.record("Restored write access to", root, Outcome::from_result(chmod));
}
