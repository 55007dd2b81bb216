//! Show command - displays resolved configuration.

use anyhow::Result;

use crate::config::Config;
use crate::genome::Genome;
use crate::render::packages;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show the resolved genome and the package set it implies
    Genome,
}

/// Execute the show command.
pub fn cmd_show(config: &Config, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
        }
        ShowTarget::Genome => {
            let genome = Genome::load(config);
            genome.print();
            let set = packages::package_set(&genome);
            println!();
            println!("Packages ({}):", set.len());
            for package in set {
                println!("  {}", package);
            }
        }
    }
    Ok(())
}
