//! Shell artifacts: the live-build driver, chroot hooks, the welcome
//! script and the boot menu.

use anyhow::Result;
use std::path::PathBuf;

use crate::genome::Genome;

use super::desktop::DesktopEntry;
use super::template::Quoting;
use super::{render, Artifact, Vars};

pub const BUILD_SCRIPT_PATH: &str = "build3.sh";
pub const HOOKS_DIR: &str = "config/hooks/live";
pub const WELCOME_SCRIPT_PATH: &str = "config/includes.chroot/usr/local/bin/furryos-welcome";
pub const WELCOME_DESKTOP_PATH: &str =
    "config/includes.chroot/etc/xdg/autostart/furryos-welcome.desktop";

const BUILD_SCRIPT: &str = include_str!("../../templates/build3.sh.in");
const WELCOME_SCRIPT: &str = include_str!("../../templates/furryos-welcome.in");
const GRUB_CFG: &str = include_str!("../../templates/grub.cfg.in");

/// A chroot hook template and the condition under which it is emitted.
struct Hook {
    file: &'static str,
    template: &'static str,
    enabled: fn(&Genome) -> bool,
}

const HOOKS: &[Hook] = &[
    Hook {
        file: "01-setup-zram.hook.chroot",
        template: include_str!("../../templates/hooks/01-setup-zram.hook.chroot.in"),
        enabled: |g| g.zram,
    },
    Hook {
        file: "02-create-users.hook.chroot",
        template: include_str!("../../templates/hooks/02-create-users.hook.chroot.in"),
        enabled: |_| true,
    },
    Hook {
        file: "03-setup-power.hook.chroot",
        template: include_str!("../../templates/hooks/03-setup-power.hook.chroot.in"),
        enabled: |g| g.power_management,
    },
    Hook {
        file: "05-furryos-appearance.hook.chroot",
        template: include_str!("../../templates/hooks/05-furryos-appearance.hook.chroot.in"),
        enabled: |_| true,
    },
    Hook {
        file: "90-gaming-multiarch.hook.chroot",
        template: include_str!("../../templates/hooks/90-gaming-multiarch.hook.chroot.in"),
        enabled: |g| g.bundle("gaming"),
    },
];

pub fn build_script(vars: &Vars) -> Result<Artifact> {
    let content = render(BUILD_SCRIPT_PATH, BUILD_SCRIPT, vars, Quoting::Shell)?;
    Ok(Artifact::new(BUILD_SCRIPT_PATH, content, true))
}

/// Hooks enabled by this genome, in execution order.
pub fn hooks(genome: &Genome, vars: &Vars) -> Result<Vec<Artifact>> {
    HOOKS
        .iter()
        .filter(|hook| (hook.enabled)(genome))
        .map(|hook| {
            let content = render(hook.file, hook.template, vars, Quoting::Shell)?;
            Ok(Artifact::new(
                PathBuf::from(HOOKS_DIR).join(hook.file),
                content,
                true,
            ))
        })
        .collect()
}

/// Hook files that exist in the tree from an earlier run but are disabled
/// now. Left in place, live-build would still execute them.
pub fn disabled_hooks(genome: &Genome) -> Vec<PathBuf> {
    HOOKS
        .iter()
        .filter(|hook| !(hook.enabled)(genome))
        .map(|hook| PathBuf::from(HOOKS_DIR).join(hook.file))
        .collect()
}

/// The first-login script and its autostart entry.
pub fn welcome(vars: &Vars) -> Result<Vec<Artifact>> {
    let script = render(WELCOME_SCRIPT_PATH, WELCOME_SCRIPT, vars, Quoting::Shell)?;
    let entry = DesktopEntry::application(
        &format!("{} Welcome", vars.get("OS_NAME").map(String::as_str).unwrap_or("FurryOS")),
        "/usr/local/bin/furryos-welcome",
    )
    .comment("Link the content library and user guide on first login")
    .icon("system-software-install")
    .categories(&["System"])
    .with("X-GNOME-Autostart-enabled", "true")
    .with("X-MATE-Autostart-enabled", "true")
    .with("OnlyShowIn", "MATE;GNOME;XFCE;");

    Ok(vec![
        Artifact::new(WELCOME_SCRIPT_PATH, script, true),
        Artifact::new(WELCOME_DESKTOP_PATH, entry.to_text(), false),
    ])
}

/// Rendered welcome script alone, for embedding in the ISO.
pub fn welcome_script(vars: &Vars) -> Result<String> {
    render(WELCOME_SCRIPT_PATH, WELCOME_SCRIPT, vars, Quoting::Shell)
}

/// Boot menu for the assembled ISO.
pub fn grub_cfg(vars: &Vars) -> Result<String> {
    render("grub.cfg", GRUB_CFG, vars, Quoting::Grub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::template::placeholders;

    fn full_vars() -> Vars {
        [
            "OS_NAME",
            "VERSION",
            "CODENAME",
            "AUTHOR",
            "COMPANY",
            "DEBIAN_RELEASE",
            "ARCH",
            "USERNAME",
            "FULLNAME",
            "CONTENT_NAME",
            "GUIDE_NAME",
            "GENERATED",
        ]
        .into_iter()
        .map(|k| (k, k.to_lowercase()))
        .collect()
    }

    #[test]
    fn test_every_template_placeholder_is_provided() {
        let vars = full_vars();
        let mut templates = vec![BUILD_SCRIPT, WELCOME_SCRIPT, GRUB_CFG];
        templates.extend(HOOKS.iter().map(|h| h.template));

        for template in templates {
            for key in placeholders(template) {
                assert!(vars.contains_key(key), "no value for @{}@", key);
            }
        }
    }

    #[test]
    fn test_grub_cfg_entries() {
        let cfg = grub_cfg(&full_vars()).unwrap();
        assert_eq!(cfg.matches("menuentry").count(), 2);
        assert!(cfg.contains("username=username"));
        assert!(cfg.contains("nomodeset"));
    }

    #[test]
    fn test_welcome_artifacts() {
        let artifacts = welcome(&full_vars()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[0].executable);
        assert!(!artifacts[1].executable);
        assert!(artifacts[1].content.starts_with("[Desktop Entry]"));
    }

    #[test]
    fn test_free_text_is_escaped_per_target() {
        let mut vars = full_vars();
        vars.insert("OS_NAME", r#"Fox "Den" $1"#.to_string());
        vars.insert("FULLNAME", "O'Brien & Sons".to_string());

        let cfg = grub_cfg(&vars).unwrap();
        assert!(cfg.contains(r#"menuentry "Fox \"Den\" \$1 Live (Desktop)""#));

        let empty = crate::genome::Document {
            source: None,
            value: serde_yaml::Value::Null,
        };
        let genome = Genome::from_documents(&empty, &empty);
        let hooks = hooks(&genome, &vars).unwrap();
        let hook = |file: &str| hooks.iter().find(|h| h.path.ends_with(file)).unwrap();
        assert!(hook("02-create-users.hook.chroot")
            .content
            .contains(r#"-c "O'Brien & Sons""#));
        let branding = hook("05-furryos-appearance.hook.chroot");
        assert!(branding.content.contains(r#"OS_NAME="Fox \"Den\" \$1""#));
    }
}
