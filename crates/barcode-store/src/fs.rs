//! Real filesystem repository

use crate::types::{Result, StoreError, has_extension, move_target, validate_name};
use crate::AssetRepository;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// [`AssetRepository`] over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRepository;

impl FsRepository {
    pub fn new() -> Self {
        Self
    }
}

impl AssetRepository for FsRepository {
    fn list(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(StoreError::NotADirectory(dir.to_path_buf()));
        }

        let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
            if path.is_file() && has_extension(&path, extensions) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    fn create(&self, dirs: &[&Path]) -> Result<()> {
        for dir in dirs {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| StoreError::io(*dir, e))?;
                log::debug!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }

    fn move_file(&self, src: &Path, dest_dir: &Path) -> Result<PathBuf> {
        if !src.exists() {
            return Err(StoreError::SourceMissing(src.to_path_buf()));
        }
        if !dest_dir.is_dir() {
            return Err(StoreError::DestinationInvalid(dest_dir.to_path_buf()));
        }

        let target = move_target(src, dest_dir)?;
        if fs::rename(src, &target).is_err() {
            // rename cannot cross filesystems; fall back to copy + remove
            fs::copy(src, &target).map_err(|e| StoreError::io(&target, e))?;
            fs::remove_file(src).map_err(|e| StoreError::io(src, e))?;
        }
        log::debug!("Moved {} -> {}", src.display(), target.display());
        Ok(target)
    }

    fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        validate_name(new_name)?;

        let target = path.with_file_name(new_name);
        fs::rename(path, &target).map_err(|e| StoreError::io(path, e))?;
        Ok(target)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        fs::remove_file(path).map_err(|e| StoreError::io(path, e))
    }

    fn delete_dir(&self, path: &Path, force: bool) -> Result<()> {
        if !path.is_dir() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let result = if force {
            fs::remove_dir_all(path)
        } else {
            fs::remove_dir(path)
        };
        result.map_err(|e| match e.kind() {
            ErrorKind::DirectoryNotEmpty => StoreError::DirectoryNotEmpty(path.to_path_buf()),
            _ => StoreError::io(path, e),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
            _ => StoreError::io(path, e),
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).map_err(|e| StoreError::io(path, e))
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        let meta = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
            _ => StoreError::io(path, e),
        })?;
        Ok(meta.len())
    }
}
