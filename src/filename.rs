//! Names of the files that make up a database directory.

use std::path::{Path, PathBuf};

pub const CURRENT: &str = "CURRENT";
pub const LOCK: &str = "LOCK";

pub fn current_file_name(db_path: &Path) -> PathBuf {
    db_path.join(CURRENT)
}

pub fn lock_file_name(db_path: &Path) -> PathBuf {
    db_path.join(LOCK)
}

/// Bare manifest name, as recorded in `CURRENT`.
pub fn manifest_name(number: u64) -> String {
    format!("MANIFEST-{number:06}")
}

pub fn manifest_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(manifest_name(number))
}

pub fn log_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("{number:06}.log"))
}

pub fn table_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("{number:06}.sst"))
}

pub fn options_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("OPTIONS-{number:06}"))
}

/// Kind and number of a file found in a database directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Log(u64),
    Table(u64),
    Manifest(u64),
    Options(u64),
}

pub fn parse_file_name(name: &str) -> Option<FileType> {
    if let Some(num) = name.strip_prefix("MANIFEST-") {
        return num.parse().ok().map(FileType::Manifest);
    }
    if let Some(num) = name.strip_prefix("OPTIONS-") {
        return num.parse().ok().map(FileType::Options);
    }
    if let Some(num) = name.strip_suffix(".log") {
        return num.parse().ok().map(FileType::Log);
    }
    if let Some(num) = name.strip_suffix(".sst") {
        return num.parse().ok().map(FileType::Table);
    }
    None
}
