//! Batch overlay of barcode images onto PDF documents.
//!
//! A batch pairs the documents of one directory with the barcode images of
//! another by position, stamps each barcode onto its document's first page
//! and archives both inputs once the output is written.

mod config;
mod processor;
mod progress;
mod types;

pub use config::{AppConfig, BatchOptions, FREE_BARCODE_EXTENSION, WorkspaceLayout};
pub use processor::{
    BARCODE_EXTENSIONS, BatchProcessor, PDF_EXTENSIONS, barcode_placement, output_path,
    pair_assets, process_task,
};
pub use progress::{BatchUpdate, LogReporter, NoopReporter, ProgressReporter};
pub use types::*;
