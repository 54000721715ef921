//! # File System Operations Module / 文件系统操作模块
//!
//! Small helpers shared by the commands that write files: the starter
//! manifest, the HTML report and the operator log.
//!
//! 写文件的命令所共享的小工具：初始清单、HTML 报告和操作员日志。

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Creates the parent directory of `path` if it does not exist yet.
///
/// # Arguments
/// * `path` - Path of the file about to be written
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Opens `path` for appending, creating it and its parent directories.
pub fn open_append(path: &Path) -> Result<File> {
    ensure_parent_dir(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Gets the absolute path from a potentially relative path.
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}
