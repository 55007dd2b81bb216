//! Generate command - renders artifacts from the genome.

use anyhow::Result;

use crate::config::Config;
use crate::genome::Genome;
use crate::render::{self, packages, scripts, Artifact};

/// What to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateTarget {
    /// Every artifact
    All,
    /// `build3.sh` only
    BuildScript,
    /// The genome package list only
    Packages,
    /// Chroot hooks only
    Hooks,
    /// Welcome script and its autostart entry
    Welcome,
}

/// Render the artifacts for `target` without writing anything.
pub fn render_target(
    config: &Config,
    genome: &Genome,
    target: GenerateTarget,
) -> Result<Vec<Artifact>> {
    let vars = render::base_vars(genome, config)?;
    let mut artifacts = Vec::new();

    if matches!(target, GenerateTarget::All | GenerateTarget::BuildScript) {
        artifacts.push(scripts::build_script(&vars)?);
    }
    if matches!(target, GenerateTarget::All | GenerateTarget::Packages) {
        artifacts.push(packages::package_list(genome));
    }
    if matches!(target, GenerateTarget::All | GenerateTarget::Hooks) {
        artifacts.extend(scripts::hooks(genome, &vars)?);
    }
    if matches!(target, GenerateTarget::All | GenerateTarget::Welcome) {
        artifacts.extend(scripts::welcome(&vars)?);
    }
    Ok(artifacts)
}

/// Execute the generate command.
pub fn cmd_generate(config: &Config, target: GenerateTarget) -> Result<()> {
    let genome = Genome::load(config);
    println!(
        "Generating {} {} ({}) artifacts...",
        genome.os_name, genome.version, genome.codename
    );
    let bundles = genome.enabled_bundles();
    if !bundles.is_empty() {
        println!("  Bundles: {}", bundles.join(", "));
    }

    // Render everything before writing anything
    let artifacts = render_target(config, &genome, target)?;
    render::write_all(&config.root, &artifacts)?;

    if matches!(target, GenerateTarget::All | GenerateTarget::Hooks) {
        for stale in scripts::disabled_hooks(&genome) {
            if config.root.join(&stale).exists() {
                println!(
                    "  [WARN] {} is disabled in the genome but still present; live-build will run it",
                    stale.display()
                );
            }
        }
    }

    println!("\nGenerated {} artifact(s).", artifacts.len());
    if matches!(target, GenerateTarget::All | GenerateTarget::BuildScript) {
        println!("Next: sudo ./{}", scripts::BUILD_SCRIPT_PATH);
    }
    Ok(())
}
