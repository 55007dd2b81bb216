//! Shared test utilities for furryos tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use furryos::config::Config;
use furryos::genome::Genome;

/// A throwaway FurryOS project tree.
///
/// The project lives in `<tmp>/project` so the default artifact store
/// (`../FurryOS_Artifacts`) stays inside the temp dir.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Project root
    pub root: PathBuf,
    /// Extra configuration variables
    pub vars: HashMap<String, String>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("project");
        fs::create_dir_all(root.join("config")).expect("Failed to create config dir");

        // No network in tests unless a test points this at a local server
        let vars = HashMap::from([("FURRYOS_NTP_SERVER".to_string(), "off".to_string())]);

        Self {
            _temp_dir: temp_dir,
            root,
            vars,
        }
    }

    /// Directory beside the project, for fake tools and the like.
    pub fn scratch(&self) -> PathBuf {
        let dir = self._temp_dir.path().join("scratch");
        fs::create_dir_all(&dir).expect("Failed to create scratch dir");
        dir
    }

    pub fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn config(&self) -> Config {
        Config::from_vars(&self.root, &self.vars)
    }

    pub fn genome(&self) -> Genome {
        Genome::load(&self.config())
    }

    /// Write a file relative to the project root.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn write_genome(&self, yaml: &str) {
        self.write("config/GENOME.yaml", yaml);
    }

    pub fn write_profile(&self, yaml: &str) {
        self.write("config/USER_CONFIG.yaml", yaml);
    }

    /// Pre-extracted kernel inputs required by `assemble`.
    pub fn write_kernel(&self, names: &[&str]) {
        for name in names {
            self.write(&format!("kernel/{}", name), name);
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Create an executable shell script.
pub fn create_script(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir for script");
    }
    fs::write(path, body).expect("Failed to write script");
    let mut perms = fs::metadata(path).expect("Failed to get metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to set permissions");
}

/// A stand-in for grub-mkrescue: records its arguments in `marker` and
/// writes a small file at the `-o` path.
pub fn create_fake_mastering_tool(dir: &Path, marker: &Path) -> PathBuf {
    let tool = dir.join("fake-mkrescue");
    let body = format!(
        "#!/bin/sh\n\
         echo \"$@\" > '{}'\n\
         out=\n\
         while [ $# -gt 0 ]; do\n\
         \x20   if [ \"$1\" = \"-o\" ]; then shift; out=\"$1\"; fi\n\
         \x20   shift\n\
         done\n\
         printf 'FAKEISO' > \"$out\"\n",
        marker.display()
    );
    create_script(&tool, &body);
    tool
}

/// A local UDP address with nothing listening on it.
pub fn dead_udp_address() -> String {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("Failed to bind UDP socket");
    let addr = socket.local_addr().expect("Failed to read local address");
    drop(socket);
    addr.to_string()
}

/// Whether a shell is available for syntax checks.
pub fn have_shell(shell: &str) -> bool {
    std::process::Command::new(shell)
        .args(["-c", "true"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Parse a script with `<shell> -n`, panicking with the shell's message.
pub fn assert_shell_syntax(shell: &str, path: &Path) {
    let output = std::process::Command::new(shell)
        .arg("-n")
        .arg(path)
        .output()
        .expect("Failed to run shell");
    assert!(
        output.status.success(),
        "{} -n {} failed:\n{}",
        shell,
        path.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Non-comment lines of a package list.
pub fn list_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read list")
        .lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

/// Assert that a path does not exist.
pub fn assert_missing(path: &Path) {
    assert!(!path.exists(), "Expected no file at: {}", path.display());
}

/// Unix permission bits of a file.
pub fn mode_of(path: &Path) -> u32 {
    fs::metadata(path)
        .unwrap_or_else(|e| panic!("Failed to stat {}: {}", path.display(), e))
        .permissions()
        .mode()
        & 0o777
}
