//! Preflight command - runs preflight checks.

use anyhow::Result;

use crate::config::Config;
use crate::genome::Genome;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, strict: bool) -> Result<()> {
    let genome = Genome::load(config);
    if strict {
        preflight::run_preflight_or_fail(config, &genome)?;
    } else {
        let report = preflight::run_preflight(config, &genome);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to exit non-zero.");
        }
    }
    Ok(())
}
