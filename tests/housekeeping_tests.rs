//! Housekeeping passes and the package-list mutator on a scratch project.

mod helpers;

use helpers::{assert_file_contains, assert_file_exists, assert_missing, TestEnv};
use serial_test::serial;
use std::fs;

use furryos::commands::packages::{cmd_packages, PackagesAction};
use furryos::config::Config;
use furryos::housekeeping::{manifest, organize, prepare, sweep, tree};
use furryos::package_lists::{self, Mutation};
use furryos::report::RunSummary;

// =============================================================================
// Package-list mutator
// =============================================================================

fn lists_env() -> TestEnv {
    let env = TestEnv::new();
    env.write(
        "config/package-lists/desktop.list.chroot",
        "# desktop\nmate-utils\nfastfetch\nneofetch\n",
    );
    env.write("config/package-lists/extra/tools.list", "htop\nfastfetch\n");
    env.write("config/package-lists/readme.txt", "fastfetch is gone\n");
    env
}

fn remove(config: &Config, package: &str) -> Mutation {
    package_lists::remove(config, package, &mut RunSummary::new("Remove")).unwrap()
}

fn add(config: &Config, package: &str) -> Mutation {
    package_lists::add(config, package, &mut RunSummary::new("Add")).unwrap()
}

#[test]
fn test_remove_then_rescan_finds_nothing() {
    let env = lists_env();
    let config = env.config();

    match remove(&config, "fastfetch") {
        Mutation::Modified(files) => assert_eq!(files.len(), 2),
        other => panic!("unexpected {:?}", other),
    }
    for list in package_lists::find_lists(&config.config_dir) {
        let text = fs::read_to_string(&list).unwrap();
        assert!(!text.contains("fastfetch"), "{} still mentions it", list.display());
    }
    assert_eq!(remove(&config, "fastfetch"), Mutation::NotPresent);

    // Only list files are touched
    assert_file_contains(&env.path("config/package-lists/readme.txt"), "fastfetch");
}

#[test]
fn test_add_then_add_again() {
    let env = lists_env();
    let config = env.config();

    assert_eq!(add(&config, "htop").modified_count(), 1);
    assert_eq!(add(&config, "htop"), Mutation::AlreadyPresent);
    assert_eq!(remove(&config, "htop").modified_count(), 2);
}

#[test]
fn test_mutator_without_lists() {
    let env = TestEnv::new();
    assert_eq!(remove(&env.config(), "vim"), Mutation::NoListFiles);
    assert_eq!(add(&env.config(), "vim"), Mutation::NoListFiles);
}

#[test]
fn test_packages_command_refuses_blank_name() {
    let env = lists_env();
    let config = env.config();
    let before = fs::read_to_string(env.path("config/package-lists/desktop.list.chroot")).unwrap();

    let result = cmd_packages(&config, PackagesAction::Remove(vec!["".into()]));
    assert!(result.is_err());
    assert!(cmd_packages(&config, PackagesAction::Add("   ".into())).is_err());

    let after = fs::read_to_string(env.path("config/package-lists/desktop.list.chroot")).unwrap();
    assert_eq!(before, after);
}

// =============================================================================
// Sweep
// =============================================================================

#[test]
fn test_sweep_twice_moves_nothing_the_second_time() {
    let env = TestEnv::new();
    env.write("furryos_venv/bin/python", "py");
    env.write("scripts/__pycache__/mod.cpython-311.pyc", "bytecode");
    env.write("output/furryos-8.1.0-x86_64.iso", "iso");
    env.write("signing_keys/old.pem", "pem");
    env.write(".git/objects/pack/pack-1.bin", "git");
    env.write("build3.sh", "#!/bin/bash\n");
    let config = env.config();

    let first = sweep::sweep(&config).unwrap();
    assert_eq!(first.fail_count(), 0);
    assert_eq!(first.done_count(), 5); // 4 moves + .gitignore

    let store = &config.artifact_dir;
    assert_file_exists(&store.join("furryos_venv/bin/python"));
    assert_file_exists(&store.join("scripts/__pycache__"));
    assert_file_exists(&store.join("output/furryos-8.1.0-x86_64.iso"));
    assert_file_exists(&store.join("signing_keys/old.pem"));
    assert_file_exists(&env.path(".git/objects/pack/pack-1.bin"));
    assert_file_exists(&env.path("build3.sh"));
    assert_file_contains(&env.path(".gitignore"), "*.iso");

    let second = sweep::sweep(&config).unwrap();
    assert_eq!(second.done_count(), 1); // .gitignore rewrite only
    assert!(sweep::find_candidates(&config.root, store).unwrap().is_empty());
}

#[test]
fn test_sweep_never_enters_an_artifact_store_inside_the_project() {
    let mut env = TestEnv::new();
    env.set_var("FURRYOS_ARTIFACT_DIR", "stash");
    env.write("stash/old.iso", "iso");
    env.write("new.iso", "iso");
    let config = env.config();

    let found = sweep::find_candidates(&config.root, &config.artifact_dir).unwrap();
    assert_eq!(found, vec![env.path("new.iso")]);
}

// =============================================================================
// Organize and prepare
// =============================================================================

#[test]
fn test_organize_plan_is_dry_until_executed() {
    let env = TestEnv::new();
    env.write("notes.md", "n");
    env.write("bundle.tar.gz", "t");
    env.write("GENOME.yaml", "meta: {}\n");
    let config = env.config();

    let moves = organize::plan(&config);
    assert_eq!(moves.len(), 2);
    assert_file_exists(&env.path("notes.md"));

    organize::execute(&config, &moves).unwrap();
    assert_file_exists(&env.path("docs/notes.md"));
    assert_file_exists(&env.path("build/bundle.tar.gz"));
    assert_file_exists(&env.path("GENOME.yaml"));
}

#[test]
fn test_prepare_strips_root_and_secrets() {
    let env = TestEnv::new();
    env.write("README.md", "readme");
    env.write("random_notes.txt", "n");
    env.write("assets/Gemini_API.key.txt", "secret");
    env.write("assets/logo.png", "png");
    let config = env.config();

    let summary = prepare::prepare(&config).unwrap();
    assert_eq!(summary.fail_count(), 0);

    assert_file_exists(&env.path("README.md"));
    assert_file_exists(&env.path("assets/logo.png"));
    assert_missing(&env.path("random_notes.txt"));
    assert_missing(&env.path("assets/Gemini_API.key.txt"));
    assert_file_exists(&config.artifact_dir.join("random_notes.txt"));
    assert_file_exists(&config.artifact_dir.join("Gemini_API.key.txt"));
}

// =============================================================================
// Manifests and tree
// =============================================================================

#[test]
fn test_manifest_report_and_tree() {
    let env = TestEnv::new();
    env.write("config/package-lists/a.list.chroot", "fastfetch\n");
    env.write("output/furryos.iso", "iso");
    let config = env.config();

    let report = manifest::write_diagnostic_report(&config, "fastfetch").unwrap();
    assert_eq!(report.isos.len(), 1);
    assert_eq!(report.watch_hits.len(), 1);
    assert_file_contains(&report.path, "[FOUND ISO]");
    assert_file_contains(&report.path, "build.log does not exist.");

    let listing = tree::render_tree(&config.root).unwrap();
    assert!(listing.text.contains("furryos.iso"));
    assert!(listing.text.contains("Total: "));
}

// =============================================================================
// Configuration from the environment
// =============================================================================

#[test]
#[serial]
fn test_env_overrides_dotenv() {
    let env = TestEnv::new();
    env.write(".env", "FURRYOS_ISO_LABEL=FROM_DOTENV\nFURRYOS_CONTENT_DIR=library\n");

    std::env::set_var("FURRYOS_ISO_LABEL", "FROM_ENV");
    let config = Config::load(&env.root);
    std::env::remove_var("FURRYOS_ISO_LABEL");

    assert_eq!(config.iso_label, "FROM_ENV");
    assert_eq!(config.content_dir, env.path("library"));
    // .env is not exported into the process environment
    assert!(std::env::var("FURRYOS_CONTENT_DIR").is_err());
}

#[test]
#[serial]
fn test_api_key_file_is_never_searched_for() {
    let env = TestEnv::new();
    env.write("assets/Gemini_API.key.txt", "key");
    std::env::remove_var("FURRYOS_API_KEY_FILE");

    let config = Config::load(&env.root);
    assert!(config.api_key_file.is_none());
}
