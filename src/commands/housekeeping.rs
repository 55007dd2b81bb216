//! Housekeeping commands - sweep, organize, prepare, purge.

use anyhow::Result;

use crate::config::Config;
use crate::housekeeping::{organize, prepare, purge, sweep};
use crate::privilege;

/// Housekeeping pass to run.
pub enum HousekeepingTarget {
    /// Move heavy and binary artifacts to the artifact store
    Sweep,
    /// Classify loose files; `apply` executes the plan
    Organize { apply: bool },
    /// Keep only allow-listed root entries and secure secrets
    Prepare,
    /// Purge live-build state and reclaim ownership (needs root)
    Purge,
}

/// Execute a housekeeping command.
pub fn cmd_housekeeping(config: &Config, target: HousekeepingTarget) -> Result<()> {
    match target {
        HousekeepingTarget::Sweep => {
            let summary = sweep::sweep(config)?;
            summary.print();
        }
        HousekeepingTarget::Organize { apply } => {
            let moves = organize::plan(config);
            organize::print_plan(config, &moves);
            if !apply {
                if !moves.is_empty() {
                    println!("\nDry run. Re-run with --yes to move these files.");
                }
                return Ok(());
            }
            let summary = organize::execute(config, &moves)?;
            summary.print();
        }
        HousekeepingTarget::Prepare => {
            let summary = prepare::prepare(config)?;
            summary.print();
            println!("\nReady for `git add .`");
        }
        HousekeepingTarget::Purge => {
            if !privilege::is_root() {
                // Only returns on failure
                privilege::reexec_with_sudo()?;
            }
            let user = privilege::real_user(config)?;
            let mut summary = purge::clean_state(config);
            purge::unlock(config, &user, &mut summary);
            summary.print();
            println!("\nProject unlocked for '{}'. Rebuild with: sudo ./build3.sh", user);
        }
    }
    Ok(())
}
