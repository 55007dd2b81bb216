//! Assemble command - stages the workspace and masters the ISO.

use anyhow::Result;

use crate::assemble;
use crate::config::Config;
use crate::genome::Genome;

/// Execute the assemble command.
pub fn cmd_assemble(config: &Config) -> Result<()> {
    let genome = Genome::load(config);
    let report = assemble::create_iso(config, &genome)?;
    println!("Checksum: {}", report.checksum.display());
    if report.summary.fail_count() > 0 {
        println!(
            "[WARN] {} optional step(s) failed; the ISO may be missing content.",
            report.summary.fail_count()
        );
    }
    Ok(())
}
