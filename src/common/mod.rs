//! Shared utilities across furryos modules.

pub mod digest;
pub mod files;
pub mod temp;

pub use digest::{hash_file, FileHashes};
pub use files::{
    copy_dir_filtered, copy_dir_recursive, move_path, remove_path, write_file_mode,
    write_file_with_dirs, MODE_DATA, MODE_EXEC, MODE_SECRET,
};
pub use temp::{create_layout, prepare_work_dir};
