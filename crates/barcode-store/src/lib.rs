//! Directory-backed asset storage.
//!
//! Every component that touches files goes through [`AssetRepository`], so
//! the same pipeline runs against the real filesystem ([`FsRepository`]) or
//! an in-memory double ([`MemoryRepository`]).

mod fs;
mod memory;
mod types;

pub use fs::FsRepository;
pub use memory::MemoryRepository;
pub use types::{Result, StoreError, has_extension};

use std::path::{Path, PathBuf};

/// Filesystem capability used by the extractor, overlay engine and batch.
///
/// Implementations must tolerate concurrent calls on different files.
pub trait AssetRepository: Send + Sync {
    /// Files directly inside `dir` whose extension is one of `extensions`,
    /// sorted by file name.
    fn list(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>>;

    /// Number of files directly inside `dir` with the given extension.
    fn count(&self, dir: &Path, extension: &str) -> Result<usize> {
        Ok(self.list(dir, &[extension])?.len())
    }

    /// Create each directory (and its parents) if missing.
    fn create(&self, dirs: &[&Path]) -> Result<()>;

    /// Move `src` into the existing directory `dest_dir`, keeping its name.
    ///
    /// Returns the new path.
    fn move_file(&self, src: &Path, dest_dir: &Path) -> Result<PathBuf>;

    /// Rename a file in place. `new_name` is a bare file name.
    fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf>;

    fn delete(&self, path: &Path) -> Result<()>;

    /// Remove a directory; with `force` its contents go too.
    fn delete_dir(&self, path: &Path, force: bool) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `bytes` to `path`, replacing any existing file. The parent
    /// directory must already exist.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn file_size(&self, path: &Path) -> Result<u64>;
}
