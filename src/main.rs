//! furryos - FurryOS live ISO build tooling.
//!
//! Generates live-build configuration from the genome, assembles the
//! hybrid ISO, and keeps the project tree tidy:
//! - `generate` renders build3.sh, the package list, hooks and the welcome script
//! - `assemble` stages the workspace and masters the ISO
//! - housekeeping passes relocate artifacts, strip secrets, unlock the tree

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use furryos::commands::{self, generate::GenerateTarget};
use furryos::config::Config;
use furryos::housekeeping::manifest::DEFAULT_WATCH_PACKAGE;
use furryos::logging;

#[derive(Parser)]
#[command(name = "furryos")]
#[command(about = "FurryOS live ISO build tooling")]
#[command(
    after_help = "QUICK START:\n  furryos preflight     Check host tools and inputs\n  furryos generate      Render build3.sh, package list and hooks\n  sudo ./build3.sh      Run live-build\n  furryos assemble      Master the ISO from kernel/\n  furryos purge         Clean live-build state and unlock the tree"
)]
struct Cli {
    /// Project root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Debug logging (FURRYOS_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API key file (overrides FURRYOS_API_KEY_FILE)
    #[arg(long, global = true)]
    api_key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render artifacts from GENOME.yaml and USER_CONFIG.yaml
    Generate {
        #[command(subcommand)]
        target: Option<GenerateWhat>,
    },

    /// Assemble the hybrid ISO from kernel/ with the mastering tool
    Assemble,

    /// Edit or audit the package lists under config/
    Packages {
        #[command(subcommand)]
        action: PackagesCommand,
    },

    /// Move heavy and binary artifacts to the artifact store
    Sweep,

    /// Classify loose files into canonical folders
    Organize {
        /// Perform the moves (default: print the plan only)
        #[arg(long)]
        yes: bool,
    },

    /// Prepare the tree for publishing (keep list + secret removal)
    Prepare,

    /// Purge live-build state and reclaim ownership (re-runs under sudo)
    Purge,

    /// Write a source manifest or diagnostics report
    Manifest {
        #[command(subcommand)]
        what: ManifestCommand,
    },

    /// Print a size-annotated directory tree
    Tree {
        /// Directory to list (default: project root)
        dir: Option<PathBuf>,
    },

    /// Manage the Ed25519 signing keypair
    Keys {
        #[command(subcommand)]
        action: KeysCommand,
    },

    /// Create or verify signed release manifests, sign helper binaries
    Release {
        #[command(subcommand)]
        action: ReleaseCommand,
    },

    /// Write an NTP time claim to TIMESTAMP.txt
    Timestamp {
        /// Output file (default: TIMESTAMP.txt in the project root)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run preflight checks (host tools and project inputs)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowWhat,
    },
}

#[derive(Subcommand)]
enum GenerateWhat {
    /// Everything (default)
    All,
    /// build3.sh only
    BuildScript,
    /// config/package-lists/genome_generated.list.chroot only
    Packages,
    /// config/hooks/live/*.hook.chroot only
    Hooks,
    /// Welcome script and autostart entry only
    Welcome,
}

#[derive(Subcommand)]
enum PackagesCommand {
    /// Append a package to every list that lacks it
    Add { name: String },
    /// Remove lines mentioning any of the packages (substring match)
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Report duplicated packages and packages also installed by hooks
    Audit,
}

#[derive(Subcommand)]
enum ManifestCommand {
    /// Concatenate text sources into MANIFEST.txt
    Source,
    /// Write build diagnostics to manifest.txt
    Report {
        /// Package whose mentions are counted
        #[arg(long, default_value = DEFAULT_WATCH_PACKAGE)]
        watch: String,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    /// Generate signing_keys/furryos_signing.{key,pub}
    Generate {
        /// Overwrite existing keys
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ReleaseCommand {
    /// Hash and sign a file, writing <file>.release.json
    Create {
        file: PathBuf,
        /// Position in the release chain
        #[arg(long, default_value = "0")]
        sequence: u64,
        /// Previous release manifest in the chain
        #[arg(long)]
        previous: Option<PathBuf>,
    },
    /// Verify a release manifest against its file
    Verify {
        manifest: PathBuf,
        /// Released file (default: next to the manifest)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Write <file>.sig for every file in furryos_build/bin
    SignBins,
}

#[derive(Subcommand)]
enum ShowWhat {
    /// Show resolved configuration
    Config,
    /// Show the resolved genome and package set
    Genome,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let root = match cli.root {
        Some(root) if root.is_absolute() => root,
        Some(root) => cwd.join(root),
        None => cwd,
    };

    let mut config = Config::load(&root);
    if let Some(path) = cli.api_key_file {
        config = config.with_api_key_file(path);
    }
    tracing::debug!("project root: {}", config.root.display());

    match cli.command {
        Commands::Generate { target } => {
            let target = match target {
                None | Some(GenerateWhat::All) => GenerateTarget::All,
                Some(GenerateWhat::BuildScript) => GenerateTarget::BuildScript,
                Some(GenerateWhat::Packages) => GenerateTarget::Packages,
                Some(GenerateWhat::Hooks) => GenerateTarget::Hooks,
                Some(GenerateWhat::Welcome) => GenerateTarget::Welcome,
            };
            commands::cmd_generate(&config, target)?;
        }

        Commands::Assemble => {
            commands::cmd_assemble(&config)?;
        }

        Commands::Packages { action } => {
            use commands::packages::PackagesAction;
            let action = match action {
                PackagesCommand::Add { name } => PackagesAction::Add(name),
                PackagesCommand::Remove { names } => PackagesAction::Remove(names),
                PackagesCommand::Audit => PackagesAction::Audit,
            };
            commands::cmd_packages(&config, action)?;
        }

        Commands::Sweep => {
            use commands::housekeeping::HousekeepingTarget;
            commands::cmd_housekeeping(&config, HousekeepingTarget::Sweep)?;
        }

        Commands::Organize { yes } => {
            use commands::housekeeping::HousekeepingTarget;
            commands::cmd_housekeeping(&config, HousekeepingTarget::Organize { apply: yes })?;
        }

        Commands::Prepare => {
            use commands::housekeeping::HousekeepingTarget;
            commands::cmd_housekeeping(&config, HousekeepingTarget::Prepare)?;
        }

        Commands::Purge => {
            use commands::housekeeping::HousekeepingTarget;
            commands::cmd_housekeeping(&config, HousekeepingTarget::Purge)?;
        }

        Commands::Manifest { what } => {
            use commands::manifest::ManifestTarget;
            let target = match what {
                ManifestCommand::Source => ManifestTarget::Source,
                ManifestCommand::Report { watch } => ManifestTarget::Report { watch },
            };
            commands::cmd_manifest(&config, target)?;
        }

        Commands::Tree { dir } => {
            use commands::manifest::ManifestTarget;
            commands::cmd_manifest(&config, ManifestTarget::Tree { dir })?;
        }

        Commands::Keys { action } => match action {
            KeysCommand::Generate { force } => {
                commands::cmd_keys_generate(&config, force)?;
            }
        },

        Commands::Release { action } => {
            use commands::signing::ReleaseAction;
            let action = match action {
                ReleaseCommand::Create {
                    file,
                    sequence,
                    previous,
                } => ReleaseAction::Create {
                    file,
                    sequence,
                    previous,
                },
                ReleaseCommand::Verify { manifest, file } => {
                    ReleaseAction::Verify { manifest, file }
                }
                ReleaseCommand::SignBins => ReleaseAction::SignBins,
            };
            commands::cmd_release(&config, action)?;
        }

        Commands::Timestamp { output } => {
            commands::cmd_timestamp(&config, output)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }

        Commands::Show { what } => {
            let target = match what {
                ShowWhat::Config => commands::show::ShowTarget::Config,
                ShowWhat::Genome => commands::show::ShowTarget::Genome,
            };
            commands::cmd_show(&config, target)?;
        }
    }

    Ok(())
}
