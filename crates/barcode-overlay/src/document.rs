//! Loaded PDF documents and page geometry

use crate::types::*;
use barcode_store::AssetRepository;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};

/// US Letter, used when a page carries no readable MediaBox
const DEFAULT_PAGE_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A parsed PDF with at least one page.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub path: PathBuf,
    pub(crate) inner: Document,
}

impl PdfDocument {
    /// Load and parse the PDF at `path`.
    pub fn open(repo: &dyn AssetRepository, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !repo.is_file(&path) {
            return Err(OverlayError::NotFound(path));
        }

        let bytes = repo.read(&path)?;
        let inner = Document::load_mem(&bytes).map_err(|source| OverlayError::CorruptDocument {
            path: path.clone(),
            source,
        })?;
        if inner.get_pages().is_empty() {
            return Err(OverlayError::NoPages(path));
        }

        log::debug!("Opened {} ({} pages)", path.display(), inner.get_pages().len());
        Ok(Self { path, inner })
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Width and height of the first page in points.
    pub fn first_page_size(&self) -> Result<(f32, f32)> {
        let [x0, y0, x1, y1] = self.first_page_box()?;
        Ok(((x1 - x0).abs(), (y1 - y0).abs()))
    }

    pub fn is_portrait(&self) -> Result<bool> {
        let (width, height) = self.first_page_size()?;
        Ok(height > width)
    }

    pub(crate) fn first_page_id(&self) -> Result<ObjectId> {
        first_page_id(&self.inner).ok_or_else(|| OverlayError::NoPages(self.path.clone()))
    }

    /// MediaBox of the first page as `[llx, lly, urx, ury]`.
    pub(crate) fn first_page_box(&self) -> Result<[f32; 4]> {
        let page_id = self.first_page_id()?;
        Ok(page_box(&self.inner, page_id))
    }
}

pub(crate) fn first_page_id(doc: &Document) -> Option<ObjectId> {
    doc.get_pages().values().next().copied()
}

/// A page's MediaBox, following the page tree for inherited boxes.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .and_then(|arr| {
            let values: Vec<f32> = arr
                .iter()
                .filter_map(|obj| extract_number(resolve(doc, obj)))
                .collect();
            <[f32; 4]>::try_from(values).ok()
        })
        .unwrap_or(DEFAULT_PAGE_BOX)
}

/// Look up `key` on a page or the nearest ancestor that defines it.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id).ok()?;
    // bounded walk in case of a cyclic Parent chain
    for _ in 0..32 {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
