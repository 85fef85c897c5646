//! Image overlay for PDF documents.
//!
//! [`insert_image`] draws an image onto the first page of a document and
//! writes the result as a new file. Page geometry and every page after the
//! first are carried over unchanged.

mod document;
mod placement;
mod raster;
mod render;
mod types;

pub use document::PdfDocument;
pub use placement::{DEFAULT_WIDTH, OverlaySpec, resolve_placement};
pub use raster::RasterImage;
pub use types::*;

use barcode_store::AssetRepository;
use render::{composite_onto_page, render_overlay};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Draw the image at `image_path` onto the first page of `doc` and write
/// the whole document to `output_path`.
///
/// Missing sizes are derived from the image's aspect ratio and the
/// rectangle is clamped to the page. The image keeps its aspect ratio and
/// is centred in that rectangle. Nothing is written unless every step
/// before the write succeeds.
///
/// # Arguments
/// * `repo` - Storage for the image and the output
/// * `doc` - Source document, left unmodified
/// * `image_path` - PNG or JPEG to draw
/// * `output_path` - Destination; its directory must exist
/// * `x`, `y` - Lower-left corner of the rectangle, in points
/// * `width`, `height` - Requested size in points
///
/// # Returns
/// The rectangle the image was fitted into.
#[allow(clippy::too_many_arguments)]
pub fn insert_image(
    repo: &dyn AssetRepository,
    doc: &PdfDocument,
    image_path: &Path,
    output_path: &Path,
    x: f32,
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
) -> Result<OverlaySpec> {
    let image = RasterImage::load(repo, image_path)?;

    let [x0, y0, _, _] = doc.first_page_box()?;
    let page_size = doc.first_page_size()?;
    let spec = resolve_placement(page_size, image.ratio(), x, y, width, height);
    log::debug!(
        "Placing {} at ({}, {}) size {}x{} on {}",
        image_path.display(),
        spec.x,
        spec.y,
        spec.width,
        spec.height,
        doc.path.display()
    );

    let (overlay, overlay_page) = render_overlay(page_size, &image, &spec)?;
    let mut output = doc.inner.clone();
    composite_onto_page(
        &mut output,
        doc.first_page_id()?,
        &overlay,
        overlay_page,
        (x0, y0),
    )?;

    let write_failed = |reason: String| OverlayError::WriteFailed {
        path: output_path.to_path_buf(),
        reason,
    };
    let mut bytes = Vec::new();
    output
        .save_to(&mut bytes)
        .map_err(|e| write_failed(e.to_string()))?;
    repo.write(output_path, &bytes)
        .map_err(|e| write_failed(e.to_string()))?;

    log::info!("Wrote {}", output_path.display());
    Ok(spec)
}

/// Open `pdf_path` and run [`insert_image`] on the blocking pool.
#[allow(clippy::too_many_arguments)]
pub async fn insert_image_file(
    repo: Arc<dyn AssetRepository>,
    pdf_path: PathBuf,
    image_path: PathBuf,
    output_path: PathBuf,
    x: f32,
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
) -> Result<OverlaySpec> {
    tokio::task::spawn_blocking(move || {
        let doc = PdfDocument::open(repo.as_ref(), &pdf_path)?;
        insert_image(
            repo.as_ref(),
            &doc,
            &image_path,
            &output_path,
            x,
            y,
            width,
            height,
        )
    })
    .await?
}
