//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `generate` - Render build script, package list, hooks, welcome script
//! - `assemble` - Stage and master the ISO
//! - `packages` - Edit and audit package lists
//! - `housekeeping` - sweep, organize, prepare, purge
//! - `manifest` - Source manifest, diagnostics report, tree
//! - `signing` - Keys and signed release manifests
//! - `preflight` - Run preflight checks
//! - `show` - Display information

pub mod assemble;
pub mod generate;
pub mod housekeeping;
pub mod manifest;
pub mod packages;
mod preflight;
pub mod show;
pub mod signing;

pub use assemble::cmd_assemble;
pub use generate::cmd_generate;
pub use housekeeping::cmd_housekeeping;
pub use manifest::cmd_manifest;
pub use packages::cmd_packages;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
pub use signing::{cmd_keys_generate, cmd_release, cmd_timestamp};
