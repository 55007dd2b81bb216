//! Configuration management for furryos.
//!
//! Reads configuration from a `.env` file in the project root and from the
//! process environment. Environment variables take precedence over `.env`,
//! and CLI flags (applied by `main`) take precedence over both.
//!
//! The resulting [`Config`] is built once at startup and passed to every
//! operation. Nothing below `main` reads the environment or the current
//! working directory on its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::signing::timestamp::DEFAULT_NTP_SERVER;

/// Default content bundle directory (mirrored into the ISO).
pub const DEFAULT_CONTENT_DIR: &str = "ANTHROHEART";
/// Default source PDF for the embedded user guide.
pub const DEFAULT_GUIDE_PDF: &str = "FurryOS_Complete_Documentation.pdf";
/// Default artifact storage, relative to the project root.
pub const DEFAULT_ARTIFACT_DIR: &str = "../FurryOS_Artifacts";
/// Default ISO mastering program.
pub const DEFAULT_MASTERING_TOOL: &str = "grub-mkrescue";
/// Default ISO volume label.
pub const DEFAULT_ISO_LABEL: &str = "FURRYOS_LIVE";
/// `FURRYOS_NTP_SERVER` values that disable the time query.
const NTP_DISABLED: [&str; 3] = ["", "off", "none"];

/// Furryos configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root (the live-build tree).
    pub root: PathBuf,
    /// `config/` - live-build configuration, genome and package lists.
    pub config_dir: PathBuf,
    /// `assets/` - wallpapers, icons, helper binaries.
    pub assets_dir: PathBuf,
    /// `kernel/` - pre-extracted vmlinuz, initrd.img, filesystem.squashfs.
    pub kernel_dir: PathBuf,
    /// Content bundle mirrored into the ISO.
    pub content_dir: PathBuf,
    /// Compiled documentation PDF embedded as the user guide.
    pub guide_pdf: PathBuf,
    /// `furryos_build/` - ISO workspace parent and compiled helper binaries.
    pub build_dir: PathBuf,
    /// `output/` - final ISO and checksum.
    pub output_dir: PathBuf,
    /// Where housekeeping moves heavy or sensitive files.
    pub artifact_dir: PathBuf,
    /// `signing_keys/` - Ed25519 keypair.
    pub signing_key_dir: PathBuf,
    /// Explicitly configured API key file. Never searched for.
    pub api_key_file: Option<PathBuf>,
    /// Program invoked to master the ISO.
    pub mastering_tool: String,
    /// ISO volume label.
    pub iso_label: String,
    /// Time server for release timestamps; `None` uses the system clock.
    pub ntp_server: Option<String>,
    /// Invoking user when running under sudo.
    pub sudo_user: Option<String>,
}

impl Config {
    /// Load configuration for the project rooted at `root`.
    ///
    /// Reads `root/.env` if present. Values are not exported into the
    /// process environment.
    pub fn load(root: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = root.join(".env");
        if env_path.exists() {
            match dotenvy::from_path_iter(&env_path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                env_vars.insert(key, value);
                            }
                            Err(e) => {
                                tracing::warn!("skipping malformed line in {}: {}", env_path.display(), e);
                            }
                        }
                    }
                }
                Err(e) => {
                    eprintln!("  [WARN] Could not read {}: {}", env_path.display(), e);
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        Self::from_vars(root, &env_vars)
    }

    /// Build a configuration from an explicit variable map.
    pub fn from_vars(root: &Path, vars: &HashMap<String, String>) -> Self {
        let root = root.to_path_buf();
        let path_var = |key: &str, default: &str| -> PathBuf {
            let raw = vars.get(key).map(String::as_str).unwrap_or(default);
            resolve_path(&root, raw)
        };

        let content_dir = path_var("FURRYOS_CONTENT_DIR", DEFAULT_CONTENT_DIR);
        let guide_pdf = path_var("FURRYOS_GUIDE_PDF", DEFAULT_GUIDE_PDF);
        let artifact_dir = path_var("FURRYOS_ARTIFACT_DIR", DEFAULT_ARTIFACT_DIR);
        let api_key_file = vars
            .get("FURRYOS_API_KEY_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(|s| resolve_path(&root, s));

        let mastering_tool = vars
            .get("FURRYOS_MASTERING_TOOL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MASTERING_TOOL.to_string());
        let iso_label = vars
            .get("FURRYOS_ISO_LABEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISO_LABEL.to_string());
        let ntp_server = match vars.get("FURRYOS_NTP_SERVER") {
            Some(s) if NTP_DISABLED.contains(&s.trim().to_ascii_lowercase().as_str()) => None,
            Some(s) => Some(s.trim().to_string()),
            None => Some(DEFAULT_NTP_SERVER.to_string()),
        };
        let sudo_user = vars
            .get("SUDO_USER")
            .filter(|s| !s.is_empty() && s.as_str() != "root")
            .cloned();

        Self {
            config_dir: root.join("config"),
            assets_dir: root.join("assets"),
            kernel_dir: root.join("kernel"),
            build_dir: root.join("furryos_build"),
            output_dir: root.join("output"),
            signing_key_dir: root.join("signing_keys"),
            content_dir,
            guide_pdf,
            artifact_dir,
            api_key_file,
            mastering_tool,
            iso_label,
            ntp_server,
            sudo_user,
            root,
        }
    }

    /// Override the API key file (from `--api-key-file`).
    pub fn with_api_key_file(mut self, path: PathBuf) -> Self {
        self.api_key_file = Some(resolve_path(&self.root, &path.to_string_lossy()));
        self
    }

    /// The ISO staging workspace.
    pub fn iso_workspace(&self) -> PathBuf {
        self.build_dir.join("iso_workspace")
    }

    /// Check the configured API key file: exists and is non-empty.
    pub fn api_key_status(&self) -> ApiKeyStatus {
        let Some(path) = &self.api_key_file else {
            return ApiKeyStatus::NotConfigured;
        };
        match std::fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => ApiKeyStatus::Empty,
            Ok(_) => ApiKeyStatus::Present,
            Err(_) => ApiKeyStatus::Missing,
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Project root:     {}", self.root.display());
        println!("  Config dir:       {}", self.config_dir.display());
        println!("  Content bundle:   {}", self.content_dir.display());
        println!("  User guide PDF:   {}", self.guide_pdf.display());
        println!("  Artifact storage: {}", self.artifact_dir.display());
        println!("  Output dir:       {}", self.output_dir.display());
        println!("  Signing keys:     {}", self.signing_key_dir.display());
        println!("  Mastering tool:   {}", self.mastering_tool);
        println!("  ISO label:        {}", self.iso_label);
        println!(
            "  NTP server:       {}",
            self.ntp_server.as_deref().unwrap_or("disabled (system clock)")
        );
        match &self.sudo_user {
            Some(user) => println!("  Invoking user:    {} (via sudo)", user),
            None => println!("  Invoking user:    (not under sudo)"),
        }
        let key_line = match self.api_key_status() {
            ApiKeyStatus::NotConfigured => "not configured (set FURRYOS_API_KEY_FILE)".to_string(),
            status => format!(
                "{} ({})",
                self.api_key_file
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                status.label()
            ),
        };
        println!("  API key file:     {}", key_line);
    }
}

/// State of the configured API key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyStatus {
    NotConfigured,
    Missing,
    Empty,
    Present,
}

impl ApiKeyStatus {
    pub fn label(self) -> &'static str {
        match self {
            ApiKeyStatus::NotConfigured => "not configured",
            ApiKeyStatus::Missing => "NOT FOUND",
            ApiKeyStatus::Empty => "EMPTY",
            ApiKeyStatus::Present => "found",
        }
    }
}

/// Resolve a configured path: `~/` expands to the home directory, relative
/// paths are joined onto the project root.
fn resolve_path(root: &Path, raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let root = Path::new("/work/furryos");
        let config = Config::from_vars(root, &HashMap::new());

        assert_eq!(config.config_dir, root.join("config"));
        assert_eq!(config.kernel_dir, root.join("kernel"));
        assert_eq!(config.content_dir, root.join("ANTHROHEART"));
        assert_eq!(config.artifact_dir, root.join("../FurryOS_Artifacts"));
        assert_eq!(config.mastering_tool, "grub-mkrescue");
        assert_eq!(config.iso_label, "FURRYOS_LIVE");
        assert!(config.api_key_file.is_none());
        assert_eq!(config.api_key_status(), ApiKeyStatus::NotConfigured);
        assert_eq!(config.ntp_server.as_deref(), Some("time.google.com"));
    }

    #[test]
    fn test_ntp_server_can_be_disabled() {
        let root = Path::new("/work");
        for off in ["off", "NONE", " "] {
            let config = Config::from_vars(root, &vars(&[("FURRYOS_NTP_SERVER", off)]));
            assert!(config.ntp_server.is_none(), "{:?}", off);
        }
        let config = Config::from_vars(root, &vars(&[("FURRYOS_NTP_SERVER", "pool.ntp.org")]));
        assert_eq!(config.ntp_server.as_deref(), Some("pool.ntp.org"));
    }

    #[test]
    fn test_overrides_resolve_against_root() {
        let root = Path::new("/work/furryos");
        let config = Config::from_vars(
            root,
            &vars(&[
                ("FURRYOS_CONTENT_DIR", "library"),
                ("FURRYOS_ARTIFACT_DIR", "/srv/artifacts"),
                ("FURRYOS_MASTERING_TOOL", "/usr/local/bin/fake-mkrescue"),
            ]),
        );

        assert_eq!(config.content_dir, root.join("library"));
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/artifacts"));
        assert_eq!(config.mastering_tool, "/usr/local/bin/fake-mkrescue");
    }

    #[test]
    fn test_sudo_user_ignores_root() {
        let root = Path::new("/work");
        let config = Config::from_vars(root, &vars(&[("SUDO_USER", "root")]));
        assert!(config.sudo_user.is_none());

        let config = Config::from_vars(root, &vars(&[("SUDO_USER", "tom")]));
        assert_eq!(config.sudo_user.as_deref(), Some("tom"));
    }

    #[test]
    fn test_api_key_status() {
        let dir = tempfile::TempDir::new().unwrap();
        let key = dir.path().join("api.key");

        let config = Config::from_vars(
            dir.path(),
            &vars(&[("FURRYOS_API_KEY_FILE", "api.key")]),
        );
        assert_eq!(config.api_key_status(), ApiKeyStatus::Missing);

        std::fs::write(&key, "  \n").unwrap();
        assert_eq!(config.api_key_status(), ApiKeyStatus::Empty);

        std::fs::write(&key, "secret\n").unwrap();
        assert_eq!(config.api_key_status(), ApiKeyStatus::Present);
    }
}
