//! Preflight checks for a FurryOS build.
//!
//! Validates host tools and project inputs before `build3.sh` or
//! `furryos assemble` run. Run with `furryos preflight`.

mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::genome::Genome;

pub use host_tools::LIVE_BUILD_TOOLS;
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(config: &Config, genome: &Genome) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(config));

    println!("Checking project environment...");
    checks.extend(environment::check_build_environment(config, genome));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &Config, genome: &Genome) -> Result<()> {
    let report = run_preflight(config, genome);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
