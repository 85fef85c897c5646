//! Single-file or directory extraction input

use crate::types::*;
use crate::workbook::SPREADSHEET_EXTENSION;
use crate::process_spreadsheet;
use barcode_store::AssetRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the user picked: one spreadsheet or a folder of them.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractSource {
    SingleFile(PathBuf),
    Directory(PathBuf),
}

impl ExtractSource {
    /// Classify `path` once, at the entry point.
    pub fn resolve(repo: &dyn AssetRepository, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if repo.is_file(&path) {
            Ok(ExtractSource::SingleFile(path))
        } else if repo.is_dir(&path) {
            Ok(ExtractSource::Directory(path))
        } else {
            Err(ExtractError::NotFound(path))
        }
    }

    /// Spreadsheets this source covers.
    pub fn spreadsheets(&self, repo: &dyn AssetRepository) -> Result<Vec<PathBuf>> {
        match self {
            ExtractSource::SingleFile(path) => Ok(vec![path.clone()]),
            ExtractSource::Directory(dir) => {
                let files = repo.list(dir, &[SPREADSHEET_EXTENSION])?;
                if files.is_empty() {
                    return Err(ExtractError::NoSpreadsheets(dir.clone()));
                }
                Ok(files)
            }
        }
    }
}

/// Extract every spreadsheet in `source` into `output_dir`.
///
/// A failing spreadsheet is recorded in the report and the rest still run.
pub fn extract_source(
    repo: &dyn AssetRepository,
    source: &ExtractSource,
    output_dir: &Path,
    column_index: usize,
) -> Result<ExtractReport> {
    let files = source.spreadsheets(repo)?;
    let mut report = ExtractReport::default();

    for file in &files {
        match process_spreadsheet(repo, file, output_dir, column_index) {
            Ok(written) => {
                report.processed += 1;
                report.saved += written.len();
            }
            Err(e) => {
                log::warn!("{e}");
                report.failures.push(e);
            }
        }
    }

    log::info!(
        "Extraction finished: {}/{} spreadsheets, {} barcodes saved",
        report.processed,
        files.len(),
        report.saved
    );
    Ok(report)
}

/// Async wrapper running [`extract_source`] on the blocking pool.
pub async fn extract(
    repo: Arc<dyn AssetRepository>,
    source: ExtractSource,
    output_dir: PathBuf,
    column_index: usize,
) -> Result<ExtractReport> {
    tokio::task::spawn_blocking(move || {
        extract_source(repo.as_ref(), &source, &output_dir, column_index)
    })
    .await?
}
