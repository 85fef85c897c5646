//! Barcode extraction from spreadsheet archives.
//!
//! A spreadsheet carries barcode pictures on its active sheet and their
//! identifiers in one column. Extraction pairs the two by position and
//! writes each picture as `<sanitized label>.png`.

mod images;
mod labels;
mod repair;
mod source;
mod types;
mod workbook;
mod xml;

pub use images::extract_images;
pub use labels::{DEFAULT_COLUMN_INDEX, extract_labels};
pub use repair::REPAIRED_PREFIX;
pub use source::{ExtractSource, extract, extract_source};
pub use types::*;
pub use workbook::{ActiveSheet, SPREADSHEET_EXTENSION, SpreadsheetDocument, open, repaired_path};

use barcode_store::AssetRepository;
use std::path::{Path, PathBuf};

/// Extension given to every extracted barcode file
pub const BARCODE_EXTENSION: &str = "png";

/// Filesystem-safe form of a label: every non-alphanumeric character
/// becomes `_`.
///
/// Distinct labels can collide (`"A-1"` and `"A 1"` both give `"A_1"`);
/// the later write wins.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Extract images and labels from `doc` and save them into `output_dir`.
///
/// Nothing is written unless the image and label counts match. Returns the
/// written paths in pairing order.
pub fn extract_and_save(
    repo: &dyn AssetRepository,
    doc: &SpreadsheetDocument,
    output_dir: &Path,
    column_index: usize,
) -> Result<Vec<PathBuf>> {
    let images = extract_images(doc)?;
    let labels = extract_labels(doc, column_index)?;

    if images.len() != labels.len() {
        return Err(ExtractError::CountMismatch {
            images: images.len(),
            labels: labels.len(),
        });
    }

    repo.create(&[output_dir])?;

    let mut written = Vec::with_capacity(images.len());
    for (image, label) in images.iter().zip(&labels) {
        let target = output_dir.join(format!("{}.{BARCODE_EXTENSION}", sanitize_label(label)));
        repo.write(&target, &image.data)?;
        written.push(target);
    }

    log::info!(
        "Saved {} barcodes from {} into {}",
        written.len(),
        doc.source_path.display(),
        output_dir.display()
    );
    Ok(written)
}

/// Open one spreadsheet and extract it, wrapping any failure with its path.
pub fn process_spreadsheet(
    repo: &dyn AssetRepository,
    path: &Path,
    output_dir: &Path,
    column_index: usize,
) -> std::result::Result<Vec<PathBuf>, ProcessingError> {
    open(repo, path)
        .and_then(|doc| extract_and_save(repo, &doc, output_dir, column_index))
        .map_err(|source| ProcessingError {
            path: path.to_path_buf(),
            source,
        })
}
