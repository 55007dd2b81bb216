//! Host tool availability checks.

use crate::config::Config;
use crate::process;

use super::types::CheckResult;

/// Tools the generated `build3.sh` requires: (binary, Debian package).
pub const LIVE_BUILD_TOOLS: [(&str, &str); 5] = [
    ("lb", "live-build"),
    ("rsync", "rsync"),
    ("debootstrap", "debootstrap"),
    ("xorriso", "xorriso"),
    ("mksquashfs", "squashfs-tools"),
];

/// Check host tools are installed.
pub fn check_host_tools(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for (tool, package) in LIVE_BUILD_TOOLS {
        results.push(check_tool_exists(
            tool,
            package,
            "Required by build3.sh",
            true,
        ));
    }

    // grub-mkrescue (or the configured replacement) plus its EFI helper
    results.push(check_tool_exists(
        &config.mastering_tool,
        "grub-common",
        "Required for `furryos assemble`",
        true,
    ));
    if config.mastering_tool.ends_with("grub-mkrescue") {
        results.push(check_tool_exists(
            "mformat",
            "mtools",
            "grub-mkrescue needs it for the EFI image",
            false,
        ));
    }

    results.push(check_tool_exists(
        "sudo",
        "sudo",
        "Used by `furryos purge` to re-run as root",
        false,
    ));

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => {
            let msg = format!("Not found. Install the '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
