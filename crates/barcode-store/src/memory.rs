//! In-memory repository for tests and dry runs

use crate::types::{Result, StoreError, has_extension, move_target, validate_name};
use crate::AssetRepository;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl State {
    fn add_dir_with_parents(&mut self, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.dirs.contains(parent),
            _ => true,
        }
    }
}

/// [`AssetRepository`] that keeps files and directories in a map.
///
/// Directory semantics follow the filesystem closely enough to exercise the
/// same failure paths: writes need an existing parent, moves need an
/// existing destination directory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parent directories.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.add_dir_with_parents(parent);
        }
        state.files.insert(path, bytes.into());
    }

    /// Snapshot of every stored file path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetRepository for MemoryRepository {
    fn list(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(dir) {
            return Err(StoreError::NotADirectory(dir.to_path_buf()));
        }
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir) && has_extension(p, extensions))
            .cloned()
            .collect())
    }

    fn create(&self, dirs: &[&Path]) -> Result<()> {
        let mut state = self.lock();
        for dir in dirs {
            if state.files.contains_key(*dir) {
                return Err(StoreError::io(
                    *dir,
                    std::io::Error::from(ErrorKind::AlreadyExists),
                ));
            }
            state.add_dir_with_parents(dir);
        }
        Ok(())
    }

    fn move_file(&self, src: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let mut state = self.lock();
        if !state.files.contains_key(src) {
            return Err(StoreError::SourceMissing(src.to_path_buf()));
        }
        if !state.dirs.contains(dest_dir) {
            return Err(StoreError::DestinationInvalid(dest_dir.to_path_buf()));
        }

        let target = move_target(src, dest_dir)?;
        if let Some(bytes) = state.files.remove(src) {
            state.files.insert(target.clone(), bytes);
        }
        Ok(target)
    }

    fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf> {
        let mut state = self.lock();
        if !state.files.contains_key(path) {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        validate_name(new_name)?;

        let target = path.with_file_name(new_name);
        if let Some(bytes) = state.files.remove(path) {
            state.files.insert(target.clone(), bytes);
        }
        Ok(target)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn delete_dir(&self, path: &Path, force: bool) -> Result<()> {
        let mut state = self.lock();
        if !state.dirs.contains(path) {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let has_children = state.files.keys().any(|p| p.starts_with(path))
            || state.dirs.iter().any(|d| d != path && d.starts_with(path));
        if has_children && !force {
            return Err(StoreError::DirectoryNotEmpty(path.to_path_buf()));
        }

        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|d| !d.starts_with(path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.parent_exists(path) {
            return Err(StoreError::io(
                path,
                std::io::Error::from(ErrorKind::NotFound),
            ));
        }
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        self.lock()
            .files
            .get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }
}
