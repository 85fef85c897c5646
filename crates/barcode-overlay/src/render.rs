//! Overlay page rendering and compositing
//!
//! The image is drawn onto a standalone page sized like the target page.
//! That page is then turned into a Form XObject inside the target document
//! and painted over the original first page's content.

use crate::document::{inherited, resolve};
use crate::placement::OverlaySpec;
use crate::raster::RasterImage;
use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

const IMAGE_NAME: &str = "Im0";
const OVERLAY_NAME: &str = "BcOverlay";

// =============================================================================
// Overlay Page
// =============================================================================

/// Render a one-page document of `page_size` with `image` drawn inside
/// `spec`.
///
/// The image keeps its aspect ratio and is centred in the rectangle.
/// Returns the document and its page id.
pub(crate) fn render_overlay(
    page_size: (f32, f32),
    image: &RasterImage,
    spec: &OverlaySpec,
) -> Result<(Document, ObjectId)> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let image_id = image.add_xobject(&mut doc)?;
    let content = draw_command(&spec.fit(image.ratio()));
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let resources = Dictionary::from_iter(vec![(
        "XObject",
        Object::Dictionary(Dictionary::from_iter(vec![(
            IMAGE_NAME,
            Object::Reference(image_id),
        )])),
    )]);

    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_size.0),
                Object::Real(page_size.1),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]));

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    Ok((doc, page_id))
}

fn draw_command(drawn: &OverlaySpec) -> String {
    format!(
        "q {} 0 0 {} {} {} cm /{IMAGE_NAME} Do Q\n",
        drawn.width, drawn.height, drawn.x, drawn.y
    )
}

// =============================================================================
// Compositing
// =============================================================================

/// Paint `overlay`'s page on top of `page_id` in `target`.
///
/// The original content is wrapped in `q`/`Q` so its graphics state cannot
/// leak into the overlay; `origin` is the lower-left corner of the target
/// page's MediaBox.
pub(crate) fn composite_onto_page(
    target: &mut Document,
    page_id: ObjectId,
    overlay: &Document,
    overlay_page: ObjectId,
    origin: (f32, f32),
) -> Result<()> {
    let mut cache = HashMap::new();
    let form_id = create_page_xobject(target, overlay, overlay_page, &mut cache)?;

    let mut resources = inherited(target, page_id, b"Resources")
        .and_then(|obj| resolve(target, obj).as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(target, obj).as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let name = unused_name(&xobjects);
    xobjects.set(name.as_bytes(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut contents = existing_contents(target, page_id);
    let prefix = target.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let suffix = format!(
        "Q\nq 1 0 0 1 {} {} cm /{name} Do Q\n",
        origin.0, origin.1
    );
    let suffix = target.add_object(Stream::new(Dictionary::new(), suffix.into_bytes()));
    contents.insert(0, Object::Reference(prefix));
    contents.push(Object::Reference(suffix));

    let page = target.get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Content stream references of a page, flattened to one list.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(contents) = doc.get_dictionary(page_id).and_then(|d| d.get(b"Contents")) else {
        return Vec::new(); // blank page
    };
    match contents {
        Object::Array(arr) => arr.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}

fn unused_name(xobjects: &Dictionary) -> String {
    let mut name = OVERLAY_NAME.to_string();
    let mut n = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{OVERLAY_NAME}{n}");
        n += 1;
    }
    name
}

// =============================================================================
// XObject Creation
// =============================================================================

/// Create a Form XObject in `output` from a page of `source`.
pub(crate) fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let media_box = page_dict.get(b"MediaBox")?.clone();
    let content = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("BBox", media_box);
    xobject_dict.set("FormType", Object::Integer(1));

    if let Ok(resources) = page_dict.get(b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    Ok(output.add_object(Stream::new(xobject_dict, content)))
}

fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let refs = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => return Ok(Vec::new()),
    };

    let mut result = Vec::new();
    for id in refs {
        if let Ok(stream) = doc.get_object(id)?.as_stream() {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            result.extend_from_slice(&content);
            result.push(b'\n');
        }
    }
    Ok(result)
}

/// Deep copy an object from `source` into `output`, following references.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }
            // reserve the id first so self-references terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, source.get_object(*id)?, cache)?;
            output.objects.insert(new_id, copied);
            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dict(output, source, dict, cache)?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut copied = Stream::new(
                copy_dict(output, source, &stream.dict, cache)?,
                stream.content.clone(),
            );
            copied.allows_compression = stream.allows_compression;
            Ok(Object::Stream(copied))
        }
        _ => Ok(obj.clone()),
    }
}

fn copy_dict(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_command_places_fitted_image() {
        let bounds = OverlaySpec {
            x: 480.0,
            y: 760.0,
            width: 120.0,
            height: 40.0,
        };
        assert_eq!(
            draw_command(&bounds.fit(2.0)),
            "q 80 0 0 40 500 760 cm /Im0 Do Q\n"
        );
    }

    #[test]
    fn unused_name_skips_taken_names() {
        let mut xobjects = Dictionary::new();
        assert_eq!(unused_name(&xobjects), "BcOverlay");
        xobjects.set("BcOverlay", Object::Null);
        xobjects.set("BcOverlay1", Object::Null);
        assert_eq!(unused_name(&xobjects), "BcOverlay2");
    }

    #[test]
    fn copy_follows_references_once() {
        let mut source = Document::with_version("1.7");
        let shared = source.add_object(Object::Integer(7));
        let arr = Object::Array(vec![Object::Reference(shared), Object::Reference(shared)]);

        let mut output = Document::with_version("1.7");
        let mut cache = HashMap::new();
        let copied = copy_object_deep(&mut output, &source, &arr, &mut cache).unwrap();

        let Object::Array(items) = copied else {
            panic!("expected array");
        };
        assert_eq!(
            items[0].as_reference().unwrap(),
            items[1].as_reference().unwrap()
        );
        assert_eq!(output.objects.len(), 1);
    }
}
