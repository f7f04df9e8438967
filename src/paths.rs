//! File plumbing: output path derivation and opening streams

use crate::config::CodecConfig;
use crate::error::CodecError;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

pub fn open_for_read(path: &Path) -> io::Result<File> {
    tracing::trace!(path = %path.display(), "opening input");
    File::open(path)
}

pub fn create_for_write(path: &Path) -> io::Result<File> {
    tracing::trace!(path = %path.display(), "creating output");
    File::create(path)
}

/// Refuse a target that names the source file itself.
///
/// Creating the target truncates it, so it must be checked before
/// anything is opened for writing.
pub fn ensure_distinct(source: &Path, target: &Path) -> Result<(), CodecError> {
    let source = std::fs::canonicalize(source)?;
    let target = match std::fs::canonicalize(target) {
        Ok(target) => target,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if source == target {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is both source and target", source.display()),
        )
        .into());
    }
    Ok(())
}

/// `book.txt` becomes `book_compressed.txt` with the default suffix.
pub fn derive_compressed_path(path: &Path, config: &CodecConfig) -> Result<PathBuf, CodecError> {
    with_suffix(path, &config.compressed_suffix)
}

/// `book_compressed.txt` becomes `book_compressed_uncompressed.txt` with
/// the default suffix.
pub fn derive_decompressed_path(
    path: &Path,
    config: &CodecConfig,
) -> Result<PathBuf, CodecError> {
    with_suffix(path, &config.decompressed_suffix)
}

fn with_suffix(path: &Path, suffix: &str) -> Result<PathBuf, CodecError> {
    let stem = path.file_stem().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        )
    })?;

    let mut name = OsString::from(stem);
    name.push(suffix);
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    Ok(path.with_file_name(name))
}
