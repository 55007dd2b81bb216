//! Root privilege checks and sudo re-execution.

use anyhow::{bail, Context, Result};
use std::ffi::CStr;
use std::os::unix::fs::MetadataExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use crate::config::Config;

/// Whether the effective user is root.
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Replace this process with `sudo <self> <args...>`.
///
/// Only returns on failure. `FURRYOS_*` variables are forwarded, since sudo
/// resets the environment by default.
pub fn reexec_with_sudo() -> Result<()> {
    let exe = std::env::current_exe().context("Cannot locate the running executable")?;
    let forwarded: Vec<String> = std::env::vars()
        .map(|(k, _)| k)
        .filter(|k| k.starts_with("FURRYOS_"))
        .collect();

    let mut cmd = Command::new("sudo");
    if !forwarded.is_empty() {
        cmd.arg(format!("--preserve-env={}", forwarded.join(",")));
    }
    cmd.arg(exe).args(std::env::args_os().skip(1));

    println!("Root permissions needed. Relaunching with sudo...");
    let err = cmd.exec();
    Err(err).context("Failed to relaunch under sudo")
}

/// The human user to hand the project back to: the sudo invoker, else the
/// owner of `build.sh` (or the project root itself when that is absent).
pub fn real_user(config: &Config) -> Result<String> {
    if let Some(user) = &config.sudo_user {
        return Ok(user.clone());
    }

    let build_sh = config.root.join("build.sh");
    let owner_path: &Path = if build_sh.exists() {
        &build_sh
    } else {
        &config.root
    };
    println!(
        "  [WARN] Could not detect the invoking user; using the owner of {}",
        owner_path.display()
    );
    let uid = std::fs::metadata(owner_path)
        .with_context(|| format!("Cannot stat {}", owner_path.display()))?
        .uid();
    user_name(uid)
}

/// Look up a user name by uid.
pub fn user_name(uid: u32) -> Result<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: all-zero is a valid bit pattern for `passwd`.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: buf and pwd outlive the call; result is only read afterwards.
    let rc = unsafe {
        libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
    };
    if rc != 0 || result.is_null() {
        bail!("No user with uid {}", uid);
    }

    // SAFETY: on success pw_name points into buf, NUL-terminated.
    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_uid_is_root() {
        assert_eq!(user_name(0).unwrap(), "root");
    }

    #[test]
    fn test_sudo_user_wins() {
        let mut vars = std::collections::HashMap::new();
        vars.insert("SUDO_USER".to_string(), "fox".to_string());
        let config = Config::from_vars(Path::new("/nonexistent"), &vars);
        assert_eq!(real_user(&config).unwrap(), "fox");
    }

    #[test]
    fn test_falls_back_to_root_owner() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::from_vars(dir.path(), &Default::default());
        // SAFETY: no preconditions.
        let me = unsafe { libc::getuid() };
        assert_eq!(real_user(&config).unwrap(), user_name(me).unwrap());
    }
}
