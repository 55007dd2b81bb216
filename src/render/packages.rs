//! Genome-derived package list.

use std::collections::BTreeSet;

use crate::genome::Genome;

use super::Artifact;

/// Destination of the generated list, relative to the project root.
pub const PACKAGE_LIST_PATH: &str = "config/package-lists/genome_generated.list.chroot";

/// Always installed.
pub const BASE_PACKAGES: &[&str] = &[
    // Desktop and installer
    "task-mate-desktop",
    "mate-utils",
    "plymouth",
    "plymouth-themes",
    "calamares",
    "calamares-settings-debian",
    // Kernel and firmware
    "linux-image-amd64",
    "firmware-linux",
    "firmware-iwlwifi",
    "firmware-misc-nonfree",
    // Storage
    "btrfs-progs",
    "gparted",
    "dosfstools",
    // Performance
    "tlp",
    "zram-tools",
];

/// Added when the audio server is PipeWire.
pub const PIPEWIRE_PACKAGES: &[&str] = &["pipewire", "pipewire-pulse", "wireplumber", "pavucontrol"];

/// Packages contributed by a feature bundle.
pub fn bundle_packages(bundle: &str) -> &'static [&'static str] {
    match bundle {
        "gaming" => &["steam-installer", "lutris", "gamemode"],
        "development" => &["git", "python3", "build-essential"],
        "multimedia" => &["gimp", "obs-studio", "vlc"],
        "office" => &["libreoffice"],
        _ => &[],
    }
}

/// The full, de-duplicated package set for a genome.
pub fn package_set(genome: &Genome) -> BTreeSet<&'static str> {
    let mut packages: BTreeSet<&'static str> = BASE_PACKAGES.iter().copied().collect();

    if genome
        .audio_server
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("pipewire"))
    {
        packages.extend(PIPEWIRE_PACKAGES);
    }

    for bundle in genome.enabled_bundles() {
        packages.extend(bundle_packages(bundle));
    }
    packages
}

/// Render the list file: `#` header, then one package per line, sorted.
pub fn package_list(genome: &Genome) -> Artifact {
    let packages = package_set(genome);
    let bundles = genome.enabled_bundles();

    let mut content = format!(
        "# {} {} package list\n# Generated from GENOME.yaml by furryos; edits are overwritten.\n# Bundles: {}\n",
        genome.os_name,
        genome.version,
        if bundles.is_empty() {
            "none".to_string()
        } else {
            bundles.join(", ")
        }
    );
    for package in &packages {
        content.push_str(package);
        content.push('\n');
    }

    Artifact::new(PACKAGE_LIST_PATH, content, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Document;

    fn genome(yaml: &str) -> Genome {
        let doc = Document {
            source: None,
            value: serde_yaml::from_str(yaml).unwrap(),
        };
        let empty = Document {
            source: None,
            value: serde_yaml::Value::Null,
        };
        Genome::from_documents(&doc, &empty)
    }

    #[test]
    fn test_base_only() {
        let set = package_set(&genome("{}"));
        assert_eq!(set.len(), BASE_PACKAGES.len());
        assert!(!set.contains("steam-installer"));
    }

    #[test]
    fn test_gaming_adds_exactly_its_packages() {
        let base = package_set(&genome("{}"));
        let gaming = package_set(&genome("bundles:\n  gaming: true\n"));

        let added: Vec<_> = gaming.difference(&base).copied().collect();
        assert_eq!(added, vec!["gamemode", "lutris", "steam-installer"]);
    }

    #[test]
    fn test_pipewire_and_shared_packages_deduplicate() {
        let set = package_set(&genome(
            "taxonomy:\n  family:\n    audio_server: pipewire\n\
             bundles:\n  development: true\n  multimedia: true\n",
        ));
        for p in PIPEWIRE_PACKAGES {
            assert!(set.contains(p));
        }
        assert!(set.contains("vlc"));
        assert!(set.contains("python3"));
    }

    #[test]
    fn test_list_format_sorted_with_header() {
        let artifact = package_list(&genome("bundles:\n  gaming: true\n  office: false\n"));
        assert!(!artifact.executable);

        let mut lines = artifact.content.lines();
        assert!(lines.next().unwrap().starts_with('#'));
        let packages: Vec<&str> = artifact
            .content
            .lines()
            .filter(|l| !l.starts_with('#'))
            .collect();
        let mut sorted = packages.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(packages, sorted);
        assert!(packages.contains(&"steam-installer"));
        assert!(!packages.contains(&"libreoffice"));
    }
}
