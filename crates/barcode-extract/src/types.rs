use barcode_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Unsupported spreadsheet format: {} (expected .xlsx)", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Corrupt spreadsheet archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },
    #[error("sharedStrings.xml not found in archive {}", .0.display())]
    MissingSharedStrings(PathBuf),
    #[error("No images found on the active sheet")]
    NoImagesFound,
    #[error("Column index {index} is out of range: the sheet has {columns} columns")]
    ColumnOutOfRange { index: usize, columns: usize },
    #[error("Image count ({images}) does not match label count ({labels})")]
    CountMismatch { images: usize, labels: usize },
    #[error("No spreadsheets found in {}", .0.display())]
    NoSpreadsheets(PathBuf),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ExtractError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExtractError::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Any failure while processing one spreadsheet, tagged with its path.
///
/// Drivers that walk many spreadsheets catch this one type per file and
/// move on to the next.
#[derive(Error, Debug)]
#[error("Failed to process spreadsheet {}: {source}", path.display())]
pub struct ProcessingError {
    pub path: PathBuf,
    #[source]
    pub source: ExtractError,
}

/// A raster image attached to the active sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// Archive part the payload was read from, e.g. `xl/media/image1.png`
    pub part: String,
    pub data: Vec<u8>,
}

/// Outcome of extracting from one or more spreadsheets.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Spreadsheets that were fully extracted
    pub processed: usize,
    /// Image files written across all spreadsheets
    pub saved: usize,
    pub failures: Vec<ProcessingError>,
}

impl ExtractReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
