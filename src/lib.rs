//! furryos library exports.
//!
//! The binary in `main.rs` is a thin clap front end over these modules;
//! integration tests in `tests/` use them directly.

pub mod assemble;
pub mod commands;
pub mod common;
pub mod config;
pub mod genome;
pub mod housekeeping;
pub mod logging;
pub mod package_lists;
pub mod preflight;
pub mod privilege;
pub mod process;
pub mod render;
pub mod report;
pub mod signing;
pub mod timing;
