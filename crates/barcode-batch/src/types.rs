use barcode_overlay::OverlayError;
use barcode_store::StoreError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a whole batch before any task runs.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("No PDF directory given")]
    MissingPdfDir,
    #[error("No output directory given")]
    MissingOutputDir,
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("No {kind} files found in {}", dir.display())]
    EmptyInput { kind: AssetKind, dir: PathBuf },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Worker pool closed: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BatchError>;

/// The two kinds of input a batch consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Pdf,
    Barcode,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Pdf => write!(f, "PDF"),
            AssetKind::Barcode => write!(f, "barcode image"),
        }
    }
}

/// Why one pair failed.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error("archiving failed: {0}")]
    Archive(#[from] StoreError),
    #[error("archive directory missing: {}", .0.display())]
    ArchiveMissing(PathBuf),
}

/// One (document, barcode) pair scheduled for overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingTask {
    pub pdf: PathBuf,
    pub barcode: PathBuf,
    /// Where the overlaid document is written
    pub output: PathBuf,
}

/// A pair that did not complete. Both inputs stay where they were.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub pdf: PathBuf,
    pub barcode: PathBuf,
    pub message: String,
}

impl TaskFailure {
    pub(crate) fn new(task: &ProcessingTask, message: impl Into<String>) -> Self {
        Self {
            pdf: task.pdf.clone(),
            barcode: task.barcode.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed processing {} with barcode {}: {}",
            self.pdf.display(),
            self.barcode.display(),
            self.message
        )
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Pairs that were overlaid and archived
    pub processed: usize,
    /// Pairs scheduled
    pub total: usize,
    /// Every failed pair, in completion order
    pub failures: Vec<TaskFailure>,
}

impl BatchResult {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The first `limit` failure messages, followed by a remainder line when
    /// more were recorded.
    pub fn preview(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self
            .failures
            .iter()
            .take(limit)
            .map(ToString::to_string)
            .collect();
        if self.failures.len() > limit {
            lines.push(format!("... and {} more", self.failures.len() - limit));
        }
        lines
    }
}
