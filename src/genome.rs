//! Genome and user profile loading.
//!
//! Both documents are untyped YAML. Every key read here has a hard-coded
//! default, so a missing or partial document still produces a usable
//! [`Genome`]. Nothing is cached: callers load on every invocation.

use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

pub const GENOME_FILE: &str = "GENOME.yaml";
pub const USER_CONFIG_FILES: [&str; 2] = ["USER_CONFIG.yaml", "USERCONFIG.yaml"];

/// Known feature bundles, in the order they are reported.
pub const BUNDLES: [&str; 4] = ["gaming", "development", "multimedia", "office"];

/// Where the installer wizard nests its bundle toggles.
const WIZARD_BUNDLES_PATH: [&str; 4] = ["installer", "wizard", "step4_packages", "bundles"];

/// A loaded YAML document and where it came from.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: Option<PathBuf>,
    pub value: Value,
}

impl Document {
    fn empty() -> Self {
        Self {
            source: None,
            value: Value::Null,
        }
    }

    /// Walk nested mapping keys.
    pub fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        lookup(&self.value, keys)
    }

    /// Nested string lookup. Numbers and booleans are rendered as text
    /// (`version: 8.1` is a float in YAML).
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        match self.lookup(keys)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Nested boolean lookup. Accepts YAML booleans and the usual strings.
    pub fn flag(&self, keys: &[&str]) -> Option<bool> {
        match self.lookup(keys)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "enabled" => Some(true),
                "false" | "no" | "off" | "disabled" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in keys {
        current = current.as_mapping()?.get(*key)?;
    }
    Some(current)
}

/// Load the first existing candidate, searching `config/` then the root.
///
/// A missing document yields an empty one. A document that fails to parse
/// is reported and also treated as empty, so defaults apply.
pub fn load_document(config: &Config, names: &[&str]) -> Document {
    for name in names {
        for dir in [&config.config_dir, &config.root] {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            match read_yaml(&path) {
                Ok(value) => {
                    tracing::debug!("loaded {}", path.display());
                    return Document {
                        source: Some(path),
                        value,
                    };
                }
                Err(e) => {
                    eprintln!("  [WARN] {:#}", e);
                }
            }
        }
    }
    Document::empty()
}

fn read_yaml(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(value)
}

/// Typed view over the genome and user profile with defaults applied.
#[derive(Debug, Clone)]
pub struct Genome {
    pub os_name: String,
    pub version: String,
    pub codename: String,
    pub author: String,
    pub company: String,
    pub debian_release: String,
    pub arch: String,
    pub audio_server: Option<String>,
    pub bundles: BTreeMap<String, bool>,
    pub zram: bool,
    pub power_management: bool,
    pub username: String,
    pub fullname: String,
    pub genome_source: Option<PathBuf>,
    pub profile_source: Option<PathBuf>,
}

impl Genome {
    /// Load `GENOME.yaml` and the user profile for this project.
    pub fn load(config: &Config) -> Self {
        let genome = load_document(config, &[GENOME_FILE]);
        let profile = load_document(config, &USER_CONFIG_FILES);
        Self::from_documents(&genome, &profile)
    }

    pub fn from_documents(genome: &Document, profile: &Document) -> Self {
        let os_name = genome
            .string(&["meta", "frameworkname"])
            .map(|name| branded_name(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "FurryOS".to_string());

        let mut bundles = BTreeMap::new();
        for bundle in BUNDLES {
            let top = genome.flag(&["bundles", bundle]).unwrap_or(false);
            let mut wizard_path = WIZARD_BUNDLES_PATH.to_vec();
            wizard_path.push(bundle);
            let wizard = genome.flag(&wizard_path).unwrap_or(false);
            bundles.insert(bundle.to_string(), top || wizard);
        }

        Self {
            os_name,
            version: genome
                .string(&["meta", "version"])
                .unwrap_or_else(|| "8.1.0".to_string()),
            codename: genome
                .string(&["meta", "codename"])
                .unwrap_or_else(|| "sovereign".to_string()),
            author: genome
                .string(&["meta", "author"])
                .unwrap_or_else(|| "Thomas B Sweet".to_string()),
            company: genome
                .string(&["meta", "owner"])
                .unwrap_or_else(|| "Anthro Entertainment LLC".to_string()),
            debian_release: genome
                .string(&["taxonomy", "family", "base"])
                .unwrap_or_else(|| "trixie".to_string()),
            arch: genome
                .string(&["taxonomy", "family", "arch"])
                .unwrap_or_else(|| "amd64".to_string()),
            audio_server: genome.string(&["taxonomy", "family", "audio_server"]),
            bundles,
            zram: genome.flag(&["features", "zram"]).unwrap_or(true),
            power_management: genome
                .flag(&["features", "power_management"])
                .unwrap_or(true),
            username: profile
                .string(&["userprofile", "username"])
                .unwrap_or_else(|| "anthro".to_string()),
            fullname: profile
                .string(&["userprofile", "fullname"])
                .unwrap_or_else(|| "Anthro User".to_string()),
            genome_source: genome.source.clone(),
            profile_source: profile.source.clone(),
        }
    }

    /// Whether a named bundle is enabled.
    pub fn bundle(&self, name: &str) -> bool {
        self.bundles.get(name).copied().unwrap_or(false)
    }

    /// Enabled bundle names, in [`BUNDLES`] order.
    pub fn enabled_bundles(&self) -> Vec<&'static str> {
        BUNDLES.into_iter().filter(|b| self.bundle(b)).collect()
    }

    /// Print the resolved genome.
    pub fn print(&self) {
        println!("Genome:");
        match &self.genome_source {
            Some(p) => println!("  Source:   {}", p.display()),
            None => println!("  Source:   (none found, using defaults)"),
        }
        println!("  OS name:  {}", self.os_name);
        println!("  Version:  {} ({})", self.version, self.codename);
        println!("  Author:   {} / {}", self.author, self.company);
        println!("  Debian:   {} [{}]", self.debian_release, self.arch);
        println!(
            "  Audio:    {}",
            self.audio_server.as_deref().unwrap_or("(default)")
        );
        for (name, enabled) in &self.bundles {
            println!("  Bundle {:<12} {}", name, if *enabled { "ON" } else { "off" });
        }
        println!("  ZRAM hook: {}  Power hook: {}", self.zram, self.power_management);
        println!();
        println!("User profile:");
        match &self.profile_source {
            Some(p) => println!("  Source:   {}", p.display()),
            None => println!("  Source:   (none found, using defaults)"),
        }
        println!("  User:     {} ({})", self.username, self.fullname);
    }
}

/// `furry_os` / `furry os` -> `FurryOs`: title-case each word, drop
/// separators.
fn branded_name(raw: &str) -> String {
    raw.split(|c: char| c == ' ' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}
