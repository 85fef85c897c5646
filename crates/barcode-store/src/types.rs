use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Source file missing: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("Destination directory does not exist: {}", .0.display())]
    DestinationInvalid(PathBuf),
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("Directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Check whether `path` carries one of `extensions`.
///
/// Extensions may be given with or without the leading dot and compare
/// case-insensitively, so `".PNG"` matches `"png"`.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Reject names that are empty or would escape the parent directory.
pub(crate) fn validate_name(new_name: &str) -> Result<()> {
    if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
        return Err(StoreError::InvalidName(new_name.to_string()));
    }
    Ok(())
}

/// Target path of a move: `dest_dir/<file name of src>`.
pub(crate) fn move_target(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| StoreError::SourceMissing(src.to_path_buf()))?;
    Ok(dest_dir.join(name))
}
