//! Project environment checks (inputs, configuration, disk space).

use std::fs;
use std::path::Path;

use crate::assemble::missing_kernel_files;
use crate::config::{ApiKeyStatus, Config};
use crate::genome::Genome;
use crate::package_lists;
use crate::privilege;
use crate::process::Cmd;
use crate::signing::KeyPaths;

use super::types::CheckResult;

/// Minimum free space for a live-build run.
const MIN_FREE_GB: u64 = 20;

pub fn check_build_environment(config: &Config, genome: &Genome) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match &genome.genome_source {
        Some(path) => results.push(CheckResult::pass_with("genome", &path.display().to_string())),
        None => results.push(CheckResult::warn(
            "genome",
            "GENOME.yaml not found in config/ or the project root - using defaults",
        )),
    }
    match &genome.profile_source {
        Some(path) => results.push(CheckResult::pass_with("user profile", &path.display().to_string())),
        None => results.push(CheckResult::warn(
            "user profile",
            "USER_CONFIG.yaml not found - default user 'anthro'",
        )),
    }

    let missing = missing_kernel_files(&config.kernel_dir);
    if missing.is_empty() {
        results.push(CheckResult::pass_with(
            "kernel files",
            &config.kernel_dir.display().to_string(),
        ));
    } else {
        for path in missing {
            results.push(CheckResult::fail(
                &path.display().to_string(),
                "Not found - required for `furryos assemble`",
            ));
        }
    }

    if config.content_dir.is_dir() {
        results.push(CheckResult::pass("content bundle"));
    } else {
        results.push(CheckResult::warn(
            "content bundle",
            &format!("{} not found - ISO ships without it", config.content_dir.display()),
        ));
    }

    if config.guide_pdf.is_file() {
        results.push(CheckResult::pass("user guide PDF"));
    } else {
        results.push(CheckResult::warn(
            "user guide PDF",
            &format!("{} not found - ISO ships without it", config.guide_pdf.display()),
        ));
    }

    results.push(check_writable("output/ writable", &config.output_dir));

    let api_key = match config.api_key_status() {
        ApiKeyStatus::NotConfigured => CheckResult::skip("API key", "FURRYOS_API_KEY_FILE not set"),
        ApiKeyStatus::Present => CheckResult::pass("API key"),
        status => CheckResult::warn("API key", status.label()),
    };
    results.push(api_key);

    if KeyPaths::in_dir(&config.signing_key_dir).exist() {
        results.push(CheckResult::pass("signing keys"));
    } else {
        results.push(CheckResult::warn(
            "signing keys",
            "Not found - run `furryos keys generate` before `furryos release create`",
        ));
    }

    match package_lists::audit(config) {
        Ok(audit) if audit.list_files == 0 => results.push(CheckResult::warn(
            "package lists",
            "No lists under config/ - run `furryos generate packages`",
        )),
        Ok(audit) if audit.is_clean() => results.push(CheckResult::pass_with(
            "package lists",
            &format!("{} lists", audit.list_files),
        )),
        Ok(audit) => results.push(CheckResult::warn(
            "package lists",
            &format!(
                "{} duplicated, {} also installed by hooks - see `furryos packages audit`",
                audit.duplicates.len(),
                audit.hook_overlaps.len()
            ),
        )),
        Err(e) => results.push(CheckResult::warn("package lists", &format!("{:#}", e))),
    }

    if privilege::is_root() {
        results.push(CheckResult::pass("root"));
    } else {
        results.push(CheckResult::warn(
            "root",
            "Not root - build3.sh and `furryos purge` need sudo",
        ));
    }

    if let Some(check) = check_disk_space(&config.root) {
        results.push(check);
    }

    results
}

fn check_writable(name: &str, dir: &Path) -> CheckResult {
    if let Err(e) = fs::create_dir_all(dir) {
        return CheckResult::fail(name, &format!("Cannot create {}: {}", dir.display(), e));
    }
    let scratch = dir.join(".preflight-test");
    match fs::write(&scratch, "test") {
        Ok(()) => {
            let _ = fs::remove_file(&scratch);
            CheckResult::pass(name)
        }
        Err(e) => CheckResult::fail(name, &format!("Cannot write to {}: {}", dir.display(), e)),
    }
}

/// Free space via `df`; `None` when df is unavailable.
fn check_disk_space(root: &Path) -> Option<CheckResult> {
    let result = Cmd::new("df")
        .args(["--output=avail", "-B1"])
        .arg_path(root)
        .allow_fail()
        .run()
        .ok()?;
    if !result.success() {
        return None;
    }
    let avail: u64 = result.stdout_trimmed().lines().nth(1)?.trim().parse().ok()?;
    let free_gb = avail / (1024 * 1024 * 1024);
    Some(if free_gb < MIN_FREE_GB {
        CheckResult::warn(
            "disk space",
            &format!("{}GB free - a live-build run needs ~{}GB", free_gb, MIN_FREE_GB),
        )
    } else {
        CheckResult::pass_with("disk space", &format!("{}GB free", free_gb))
    })
}
