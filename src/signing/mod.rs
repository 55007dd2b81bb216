//! Release signing: Ed25519 keys, signed JSON release manifests, detached
//! binary signatures and NTP time claims.

pub mod binaries;
pub mod keys;
pub mod release;
pub mod timestamp;

pub use binaries::{sign_binaries, signature_path_for, verify_file};
pub use keys::{load_signing_key, load_verifying_key, write_new_keypair, KeyPaths};
pub use release::{
    create, manifest_path_for, read_manifest, verify, write_manifest, CreateOptions,
    ReleaseManifest,
};
pub use timestamp::{claim_time, TimeClaim, TimeSource};
