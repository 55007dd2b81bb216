//! Signing keys and release manifests through the command layer.

mod helpers;

use helpers::{assert_file_contains, assert_file_exists, dead_udp_address, mode_of, TestEnv};
use std::fs;

use furryos::commands::signing::{cmd_keys_generate, cmd_release, cmd_timestamp, ReleaseAction};
use furryos::signing::{self, manifest_path_for, signature_path_for, KeyPaths};

fn env_with_keys() -> TestEnv {
    let env = TestEnv::new();
    cmd_keys_generate(&env.config(), false).unwrap();
    env
}

#[test]
fn test_keys_generate_layout() {
    let env = env_with_keys();
    let keys = KeyPaths::in_dir(&env.config().signing_key_dir);

    assert_eq!(mode_of(&keys.private), 0o600);
    assert_eq!(mode_of(&keys.public), 0o644);
    assert_file_contains(&keys.public, "-----BEGIN PUBLIC KEY-----");
    assert_file_contains(&keys.readme, "Algorithm: Ed25519");

    assert!(cmd_keys_generate(&env.config(), false).is_err());
}

#[test]
fn test_release_round_trip() {
    let env = env_with_keys();
    let iso = env.write("output/furryos-8.1.0-x86_64.iso", "pretend iso bytes");
    let config = env.config();

    cmd_release(
        &config,
        ReleaseAction::Create {
            file: "output/furryos-8.1.0-x86_64.iso".into(),
            sequence: 0,
            previous: None,
        },
    )
    .unwrap();

    let manifest_path = manifest_path_for(&iso);
    assert_file_exists(&manifest_path);
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    assert_eq!(json["manifest_version"], "1.0");
    assert_eq!(json["file_info"]["filename"], "furryos-8.1.0-x86_64.iso");
    assert_eq!(json["file_info"]["size_bytes"], 17);
    assert_eq!(json["identity"]["algorithm"], "Ed25519");
    assert_eq!(json["metadata"]["organization"], "Anthro Entertainment LLC");
    assert!(json["timestamp_claim"].as_str().unwrap().ends_with('Z'));

    cmd_release(
        &config,
        ReleaseAction::Verify {
            manifest: manifest_path.clone(),
            file: None,
        },
    )
    .unwrap();
}

#[test]
fn test_release_verify_detects_tampering() {
    let env = env_with_keys();
    let iso = env.write("output/a.iso", "original");
    let config = env.config();
    let keys = KeyPaths::in_dir(&config.signing_key_dir);
    let key = signing::load_signing_key(&keys.private).unwrap();

    let manifest = signing::create(&iso, &key, &Default::default()).unwrap();
    let manifest_path = manifest_path_for(&iso);
    signing::write_manifest(&manifest_path, &manifest).unwrap();

    fs::write(&iso, "tampered").unwrap();
    let verify = |config: &furryos::config::Config| {
        cmd_release(
            config,
            ReleaseAction::Verify {
                manifest: manifest_path.clone(),
                file: None,
            },
        )
    };
    assert!(verify(&config).is_err());

    // Same size, different bytes
    fs::write(&iso, "origina1").unwrap();
    assert!(verify(&config).is_err());

    fs::write(&iso, "original").unwrap();
    assert!(verify(&config).is_ok());

    // Editing the recorded size breaks verification
    let mut forged = manifest.clone();
    forged.file_info.size_bytes += 1;
    signing::write_manifest(&manifest_path, &forged).unwrap();
    assert!(verify(&config).is_err());
}

#[test]
fn test_release_chain_links_previous_manifest() {
    let env = env_with_keys();
    env.write("output/v1.iso", "one");
    env.write("output/v2.iso", "two");
    let config = env.config();

    cmd_release(
        &config,
        ReleaseAction::Create {
            file: "output/v1.iso".into(),
            sequence: 0,
            previous: None,
        },
    )
    .unwrap();
    cmd_release(
        &config,
        ReleaseAction::Create {
            file: "output/v2.iso".into(),
            sequence: 1,
            previous: Some("output/v1.iso.release.json".into()),
        },
    )
    .unwrap();

    let genesis = config.root.join("output/v1.iso.release.json");
    let next = signing::read_manifest(&config.root.join("output/v2.iso.release.json")).unwrap();
    assert_eq!(next.sequence, 1);
    assert_eq!(
        next.previous_record,
        Some(furryos::common::hash_file(&genesis).unwrap().sha256)
    );
}

#[test]
fn test_release_create_without_keys_fails() {
    let env = TestEnv::new();
    env.write("output/a.iso", "x");
    let result = cmd_release(
        &env.config(),
        ReleaseAction::Create {
            file: "output/a.iso".into(),
            sequence: 0,
            previous: None,
        },
    );
    let msg = format!("{:#}", result.unwrap_err());
    assert!(msg.contains("keys generate"), "{}", msg);
}

#[test]
fn test_manifest_cannot_point_outside_its_directory() {
    let env = env_with_keys();
    env.write("secret.txt", "not released");
    let iso = env.write("output/a.iso", "a");
    let config = env.config();
    let keys = KeyPaths::in_dir(&config.signing_key_dir);
    let key = signing::load_signing_key(&keys.private).unwrap();

    let mut manifest = signing::create(&iso, &key, &Default::default()).unwrap();
    manifest.file_info.filename = "../secret.txt".into();
    let manifest_path = manifest_path_for(&iso);
    signing::write_manifest(&manifest_path, &manifest).unwrap();

    let result = cmd_release(
        &config,
        ReleaseAction::Verify {
            manifest: manifest_path,
            file: None,
        },
    );
    let msg = format!("{:#}", result.unwrap_err());
    assert!(msg.contains("not a plain file name"), "{}", msg);
}

#[test]
fn test_sign_bins_writes_verifiable_signatures() {
    let env = env_with_keys();
    let core = env.write("furryos_build/bin/heartbeat_core", "\x7fELF core");
    let healer = env.write("furryos_build/bin/healer_core", "\x7fELF healer");
    let config = env.config();

    cmd_release(&config, ReleaseAction::SignBins).unwrap();

    let public = KeyPaths::in_dir(&config.signing_key_dir).public;
    let verifying = signing::load_verifying_key(&public).unwrap();
    for bin in [&core, &healer] {
        assert_file_exists(&signature_path_for(bin));
        signing::verify_file(bin, &verifying).unwrap();
    }

    // Re-signing does not sign the signatures
    cmd_release(&config, ReleaseAction::SignBins).unwrap();
    assert!(!signature_path_for(&signature_path_for(&core)).exists());
}

#[test]
fn test_sign_bins_without_binaries_is_not_fatal() {
    let env = env_with_keys();
    cmd_release(&env.config(), ReleaseAction::SignBins).unwrap();
}

#[test]
fn test_release_falls_back_to_system_time_when_ntp_unreachable() {
    let mut env = env_with_keys();
    env.set_var("FURRYOS_NTP_SERVER", &dead_udp_address());
    let iso = env.write("output/a.iso", "a");
    let config = env.config();

    cmd_release(
        &config,
        ReleaseAction::Create {
            file: "output/a.iso".into(),
            sequence: 0,
            previous: None,
        },
    )
    .unwrap();

    let manifest = signing::read_manifest(&manifest_path_for(&iso)).unwrap();
    assert_eq!(manifest.metadata["time_source"], "system");
    assert!(manifest.timestamp_claim.ends_with('Z'));
}

#[test]
fn test_timestamp_file_records_fallback() {
    let mut env = TestEnv::new();
    env.set_var("FURRYOS_NTP_SERVER", &dead_udp_address());

    cmd_timestamp(&env.config(), None).unwrap();

    let path = env.path("TIMESTAMP.txt");
    assert_file_contains(&path, "Query Success: No (using system time)");
    assert_file_contains(&path, "Error Details: ");
    assert_file_contains(&path, "Unix Epoch (seconds): ");
}
