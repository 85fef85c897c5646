use barcode_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Unreadable PDF {}: {source}", path.display())]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("Document has no pages: {}", .0.display())]
    NoPages(PathBuf),
    #[error("Image not found: {}", .0.display())]
    ImageNotFound(PathBuf),
    #[error("Unreadable image {}: {source}", path.display())]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image encoding failed: {0}")]
    Encode(#[source] std::io::Error),
    #[error("Failed to write {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
