//! ISO assembly from pre-extracted kernel files.
//!
//! Stages `furryos_build/iso_workspace`, fills it with the live kernel, the
//! content bundle, documentation and embedded source, writes the boot menu
//! and hands the tree to the mastering tool (`grub-mkrescue` by default).
//!
//! Required inputs are checked before anything is staged, so a missing
//! kernel never reaches the mastering tool.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{
    copy_dir_filtered, copy_dir_recursive, create_layout, digest, hash_file, prepare_work_dir,
    write_file_mode, MODE_DATA, MODE_EXEC,
};
use crate::config::Config;
use crate::genome::{Genome, GENOME_FILE};
use crate::process::Cmd;
use crate::render::{self, scripts, GUIDE_NAME};
use crate::report::{Outcome, RunSummary};
use crate::timing::PhaseTimes;

/// Files that must exist in `kernel/`.
pub const REQUIRED_KERNEL_FILES: [&str; 3] = ["vmlinuz", "initrd.img", "filesystem.squashfs"];

/// Workspace skeleton.
pub const WORKSPACE_LAYOUT: [&str; 7] = [
    "boot/grub",
    "live",
    "furryos/bin",
    "furryos/assets",
    "furryos/scripts",
    "furryos/source",
    "furryos/docs",
];

/// Basenames never embedded into `furryos/source`.
const SOURCE_EXCLUDES: [&str; 4] = ["furryos_build", "output", "venv", "kernel"];

/// Root files embedded next to `assets/`.
const SOURCE_ROOT_FILES: [&str; 2] = ["quick_start.sh", GENOME_FILE];

/// Paths used during assembly.
#[derive(Debug, Clone)]
pub struct IsoPaths {
    pub workspace: PathBuf,
    pub kernel_dir: PathBuf,
    pub iso_output: PathBuf,
    pub checksum: PathBuf,
}

impl IsoPaths {
    pub fn new(config: &Config, genome: &Genome) -> Self {
        let iso_output = config
            .output_dir
            .join(format!("furryos-{}-x86_64.iso", genome.version));
        let checksum = PathBuf::from(format!("{}.sha256", iso_output.display()));
        Self {
            workspace: config.iso_workspace(),
            kernel_dir: config.kernel_dir.clone(),
            iso_output,
            checksum,
        }
    }

    fn furryos(&self, sub: &str) -> PathBuf {
        self.workspace.join("furryos").join(sub)
    }
}

/// What an assembly run produced.
#[derive(Debug)]
pub struct AssembleReport {
    pub iso: PathBuf,
    pub checksum: PathBuf,
    pub sha256: String,
    pub size: u64,
    pub summary: RunSummary,
    pub phases: PhaseTimes,
}

/// Missing required kernel inputs, by path.
pub fn missing_kernel_files(kernel_dir: &Path) -> Vec<PathBuf> {
    REQUIRED_KERNEL_FILES
        .iter()
        .map(|name| kernel_dir.join(name))
        .filter(|path| !path.is_file())
        .collect()
}

/// Assemble the ISO.
pub fn create_iso(config: &Config, genome: &Genome) -> Result<AssembleReport> {
    let paths = IsoPaths::new(config, genome);
    let vars = render::base_vars(genome, config)?;

    println!("=== Assembling {} {} ISO ===\n", genome.os_name, genome.version);

    validate_inputs(&paths)?;

    let mut phases = PhaseTimes::new();
    let workspace = phases.run("Stage workspace", || -> Result<PathBuf> {
        let workspace = prepare_work_dir(&config.build_dir, "iso_workspace")?;
        create_layout(&workspace, &WORKSPACE_LAYOUT)?;
        copy_kernel(&paths)?;
        Ok(workspace)
    })?;

    let mut summary = RunSummary::new("Assemble");
    phases.run("Copy content", || -> Result<()> {
        copy_content_bundle(config, &paths, &mut summary);
        copy_guide(config, &paths, &mut summary);
        install_welcome(&paths, &vars, &mut summary);
        copy_binaries(config, &paths, &mut summary);
        copy_omni(config, &paths, &mut summary);
        copy_etcher(config, &paths, &mut summary);
        embed_source(config, &paths, &mut summary);
        Ok(())
    })?;

    let grub_cfg = scripts::grub_cfg(&vars)?;
    write_file_mode(workspace.join("boot/grub/grub.cfg"), grub_cfg, MODE_DATA)?;

    phases.run("Master ISO", || master_iso(config, &paths))?;

    let hashes = hash_file(&paths.iso_output)?;
    let iso_name = paths
        .iso_output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    write_file_mode(
        &paths.checksum,
        digest::sha256sum_line(&hashes, &iso_name),
        MODE_DATA,
    )?;

    summary.print();
    phases.print();
    print_iso_summary(&paths.iso_output, &hashes.sha256, hashes.size);

    Ok(AssembleReport {
        iso: paths.iso_output,
        checksum: paths.checksum,
        sha256: hashes.sha256,
        size: hashes.size,
        summary,
        phases,
    })
}

fn validate_inputs(paths: &IsoPaths) -> Result<()> {
    let missing = missing_kernel_files(&paths.kernel_dir);
    if missing.is_empty() {
        return Ok(());
    }
    let list = missing
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    bail!(
        "Required kernel input missing:\n{}\n\nExtract vmlinuz, initrd.img and filesystem.squashfs into {} first.",
        list,
        paths.kernel_dir.display()
    );
}

fn copy_kernel(paths: &IsoPaths) -> Result<()> {
    println!("Injecting kernel files...");
    for name in REQUIRED_KERNEL_FILES {
        let src = paths.kernel_dir.join(name);
        let dst = paths.workspace.join("live").join(name);
        fs::copy(&src, &dst).with_context(|| {
            format!("Failed to copy {} -> {}", src.display(), dst.display())
        })?;
    }
    Ok(())
}

fn copy_content_bundle(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let src = &config.content_dir;
    let Some(name) = src.file_name() else {
        summary.record("Copy content", src, Outcome::Skipped("no directory name".into()));
        return;
    };
    if !src.is_dir() {
        summary.record("Copy content", src, Outcome::Skipped("not present".into()));
        return;
    }
    let dst = paths.workspace.join("furryos").join(name);
    let result = copy_dir_recursive(src, &dst);
    if let Ok(count) = &result {
        tracing::debug!("content bundle: {} files", count);
    }
    summary.record("Copied content bundle", src, Outcome::from_result(result));
}

fn copy_guide(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let src = &config.guide_pdf;
    if !src.is_file() {
        println!(
            "  [WARN] User guide not found at {} (build the PDF first)",
            src.display()
        );
        summary.record("Embed guide", src, Outcome::Skipped("not present".into()));
        return;
    }
    let dst = paths.furryos("docs").join(GUIDE_NAME);
    let result = fs::copy(src, &dst)
        .with_context(|| format!("Failed to copy {}", src.display()));
    summary.record("Embedded user guide", src, Outcome::from_result(result));
}

fn install_welcome(paths: &IsoPaths, vars: &render::Vars, summary: &mut RunSummary) {
    let dst = paths.furryos("scripts").join("furryos-welcome");
    let result =
        scripts::welcome_script(vars).and_then(|text| write_file_mode(&dst, text, MODE_EXEC));
    summary.record("Installed welcome script", &dst, Outcome::from_result(result));
}

fn copy_binaries(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let src_bin = config.build_dir.join("bin");
    let entries = match fs::read_dir(&src_bin) {
        Ok(entries) => entries,
        Err(_) => {
            summary.record("Copy binaries", &src_bin, Outcome::Skipped("not present".into()));
            return;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    for file in files {
        let Some(name) = file.file_name() else { continue };
        let dst = paths.furryos("bin").join(name);
        let result = fs::copy(&file, &dst)
            .with_context(|| format!("Failed to copy {}", file.display()));
        summary.record("Copied binary", &file, Outcome::from_result(result));
    }
}

/// `assets/omni.py`, shipped as the `omni` launcher in `furryos/bin`.
pub const OMNI_SOURCE: &str = "omni.py";
pub const OMNI_NAME: &str = "omni";

fn copy_omni(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let src = config.assets_dir.join(OMNI_SOURCE);
    if !src.is_file() {
        println!("  [WARN] {} not found, ISO ships without the omni launcher", src.display());
        summary.record("Install omni", &src, Outcome::Skipped("not present".into()));
        return;
    }
    let dst = paths.furryos("bin").join(OMNI_NAME);
    let result = fs::read(&src)
        .with_context(|| format!("Failed to read {}", src.display()))
        .and_then(|data| write_file_mode(&dst, data, MODE_EXEC));
    summary.record("Installed omni", &src, Outcome::from_result(result));
}

/// First `balenaEtcher*.AppImage` in `assets/`, by name.
pub fn find_etcher(assets_dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(assets_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("balenaEtcher") && n.ends_with(".AppImage"))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn copy_etcher(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let Some(etcher) = find_etcher(&config.assets_dir) else {
        summary.record(
            "Copy flasher",
            &config.assets_dir,
            Outcome::Skipped("no balenaEtcher AppImage".into()),
        );
        return;
    };
    let Some(name) = etcher.file_name() else { return };
    let dst = paths.furryos("assets").join(name);
    let result = fs::copy(&etcher, &dst)
        .with_context(|| format!("Failed to copy {}", etcher.display()));
    summary.record("Copied flasher", &etcher, Outcome::from_result(result));
}

/// Whether a path (relative to the copy root) belongs in the embedded
/// source.
fn keep_in_source(rel: &Path) -> bool {
    let Some(name) = rel.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    !(SOURCE_EXCLUDES.contains(&name) || name.ends_with(".iso"))
}

fn embed_source(config: &Config, paths: &IsoPaths, summary: &mut RunSummary) {
    let src_dest = paths.furryos("source");

    if config.assets_dir.is_dir() {
        let result = copy_dir_filtered(&config.assets_dir, &src_dest.join("assets"), keep_in_source);
        summary.record("Embedded source", &config.assets_dir, Outcome::from_result(result));
    }

    for name in SOURCE_ROOT_FILES {
        let src = config.root.join(name);
        if !src.is_file() {
            continue;
        }
        let result = fs::copy(&src, src_dest.join(name))
            .with_context(|| format!("Failed to copy {}", src.display()));
        summary.record("Embedded source", &src, Outcome::from_result(result));
    }
}

fn master_iso(config: &Config, paths: &IsoPaths) -> Result<()> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    if paths.iso_output.exists() {
        fs::remove_file(&paths.iso_output)
            .with_context(|| format!("Failed to remove old {}", paths.iso_output.display()))?;
    }

    println!("\nMastering {} ...", paths.iso_output.display());
    Cmd::new(&config.mastering_tool)
        .arg("-o")
        .arg_path(&paths.iso_output)
        .arg_path(&paths.workspace)
        .args(["--", "-volid", config.iso_label.as_str()])
        .error_msg(format!(
            "{} failed. Install grub-common, xorriso and mtools",
            config.mastering_tool
        ))
        .run_interactive()?;

    if !paths.iso_output.is_file() {
        bail!(
            "{} exited successfully but {} was not created",
            config.mastering_tool,
            paths.iso_output.display()
        );
    }
    Ok(())
}

fn print_iso_summary(iso: &Path, sha256: &str, size: u64) {
    println!("\n=== ISO Created ===");
    println!("  Path:   {}", iso.display());
    println!("  Size:   {} MB", size / 1024 / 1024);
    println!("  SHA256: {}", sha256);
}
