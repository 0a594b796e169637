//! IO utilities.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{with_err_context, ErrorContext, Result};

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::create_dir_all(path), || {
        ErrorContext::CreateDir(path.to_path_buf())
    })?;
    Ok(())
}

pub fn create_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let file = with_err_context(File::create(path), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })?;
    Ok(file)
}

/// Opens `path` for appending, creating it if it does not exist.
pub fn append_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let file = with_err_context(
        OpenOptions::new().create(true).append(true).open(path),
        || ErrorContext::AppendFile(path.to_path_buf()),
    )?;
    Ok(file)
}

pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::write(path, contents), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })?;
    Ok(())
}

pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let data = with_err_context(std::fs::read_to_string(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })?;
    Ok(data)
}

/// Makes `path` absolute against the current directory without touching the file system.
pub fn absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path = with_err_context(std::path::absolute(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })?;
    Ok(path)
}
