//! Packages command - edits and audits the package lists.

use anyhow::Result;

use crate::config::Config;
use crate::package_lists::{self, Mutation};
use crate::report::RunSummary;

/// Package list operation.
pub enum PackagesAction {
    /// Append to every list lacking it
    Add(String),
    /// Drop matching lines from every list
    Remove(Vec<String>),
    /// Report duplicates and hook overlaps
    Audit,
}

fn report(config: &Config, verb: &str, package: &str, result: &Mutation) {
    match result {
        Mutation::Modified(files) => {
            for file in files {
                let rel = file.strip_prefix(&config.root).unwrap_or(file);
                println!("  {} '{}' in {}", verb, package, rel.display());
            }
            println!("{} '{}' in {} file(s).", verb, package, files.len());
        }
        Mutation::NotPresent => {
            println!("'{}' is not present in any package list.", package);
        }
        Mutation::AlreadyPresent => {
            println!("'{}' is already present in every package list.", package);
        }
        Mutation::NoListFiles => {
            println!(
                "No package lists under {} (*.list.chroot, *.list).",
                config.config_dir.display()
            );
        }
    }
}

/// Execute the packages command.
pub fn cmd_packages(config: &Config, action: PackagesAction) -> Result<()> {
    let mut summary = RunSummary::new("Package lists");
    match action {
        PackagesAction::Add(package) => {
            let result = package_lists::add(config, &package, &mut summary)?;
            report(config, "Added", &package, &result);
        }
        PackagesAction::Remove(names) => {
            for package in names {
                let result = package_lists::remove(config, &package, &mut summary)?;
                report(config, "Removed", &package, &result);
                if result == Mutation::NoListFiles {
                    break;
                }
            }
        }
        PackagesAction::Audit => {
            let audit = package_lists::audit(config)?;
            audit.print(&config.root);
            return Ok(());
        }
    }
    if summary.fail_count() > 0 {
        summary.print();
    }
    Ok(())
}
