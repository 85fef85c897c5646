use crate::types::*;
use barcode_store::AssetRepository;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension counted as a free barcode
pub const FREE_BARCODE_EXTENSION: &str = ".png";

/// Directory roles under one base directory.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceLayout {
    pub base: PathBuf,
    /// Overlaid documents
    pub output: PathBuf,
    /// Unconsumed barcode images
    pub active_barcodes: PathBuf,
    /// Spreadsheets waiting for extraction
    pub active_excels: PathBuf,
    /// Unconsumed documents
    pub active_pdfs: PathBuf,
    /// Barcodes archived after a successful overlay
    pub used_barcodes: PathBuf,
    /// Documents archived after a successful overlay
    pub used_pdfs: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let active = base.join("active");
        let used = base.join("used");
        Self {
            output: base.join("output"),
            active_barcodes: active.join("barcodes"),
            active_excels: active.join("excels"),
            active_pdfs: active.join("pdfs"),
            used_barcodes: used.join("barcodes"),
            used_pdfs: used.join("pdfs"),
            base,
        }
    }

    /// Create the input and output directories. The `used` partitions are
    /// created by the batch when it first archives.
    pub fn ensure_dirs(&self, repo: &dyn AssetRepository) -> Result<()> {
        repo.create(&[
            self.active_barcodes.as_path(),
            self.active_excels.as_path(),
            self.active_pdfs.as_path(),
            self.output.as_path(),
        ])?;
        Ok(())
    }

    /// Barcode images not yet attached to a document.
    pub fn free_barcodes(&self, repo: &dyn AssetRepository) -> Result<usize> {
        if !repo.is_dir(&self.active_barcodes) {
            return Ok(0);
        }
        Ok(repo.count(&self.active_barcodes, FREE_BARCODE_EXTENSION)?)
    }
}

/// Worker pool and reporting limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    pub max_workers: usize,
    /// Failures shown in a summary before the remainder line
    pub error_preview_limit: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_workers: 4,
            error_preview_limit: 5,
        }
    }
}

impl BatchOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BatchError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_dir: PathBuf,
    pub max_workers: usize,
    /// Zero-based spreadsheet column holding barcode labels
    pub label_column: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            max_workers: BatchOptions::default().max_workers,
            label_column: 3,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config = serde_json::from_slice(&bytes)
            .map_err(|e| BatchError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save settings to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BatchError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::new(&self.base_dir)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_workers: self.max_workers,
            ..BatchOptions::default()
        }
    }
}
