//! Embedded picture extraction

use crate::types::*;
use crate::workbook::SpreadsheetDocument;
use crate::xml::{parse_drawing_pictures, parse_relationships, rels_path_for, resolve_target};

const DRAWING_REL_TYPE: &str = "/drawing";

/// Images anchored on the active sheet, in drawing order.
pub fn extract_images(doc: &SpreadsheetDocument) -> Result<Vec<EmbeddedImage>> {
    let sheet_part = &doc.active_sheet.part;

    let Some(sheet_rels) = doc.read_xml_part(&rels_path_for(sheet_part))? else {
        return Err(ExtractError::NoImagesFound);
    };
    let sheet_rels =
        parse_relationships(&sheet_rels).map_err(|e| ExtractError::corrupt(&doc.path, e))?;

    let Some(drawing_part) = sheet_rels
        .iter()
        .find(|r| !r.external && r.rel_type.ends_with(DRAWING_REL_TYPE))
        .map(|r| resolve_target(sheet_part, &r.target))
    else {
        return Err(ExtractError::NoImagesFound);
    };

    let drawing_xml = doc
        .read_xml_part(&drawing_part)?
        .ok_or_else(|| ExtractError::corrupt(&doc.path, format!("missing {drawing_part}")))?;
    let embeds =
        parse_drawing_pictures(&drawing_xml).map_err(|e| ExtractError::corrupt(&doc.path, e))?;
    if embeds.is_empty() {
        return Err(ExtractError::NoImagesFound);
    }

    let drawing_rels_part = rels_path_for(&drawing_part);
    let drawing_rels = doc
        .read_xml_part(&drawing_rels_part)?
        .ok_or_else(|| ExtractError::corrupt(&doc.path, format!("missing {drawing_rels_part}")))?;
    let drawing_rels =
        parse_relationships(&drawing_rels).map_err(|e| ExtractError::corrupt(&doc.path, e))?;

    let mut images = Vec::with_capacity(embeds.len());
    for embed in &embeds {
        // linked (external) pictures carry no payload
        let Some(rel) = drawing_rels.iter().find(|r| &r.id == embed && !r.external) else {
            log::warn!("Picture {embed} in {drawing_part} has no embedded payload, skipping");
            continue;
        };
        let part = resolve_target(&drawing_part, &rel.target);
        let data = doc
            .read_part(&part)?
            .ok_or_else(|| ExtractError::corrupt(&doc.path, format!("missing {part}")))?;
        images.push(EmbeddedImage { part, data });
    }

    if images.is_empty() {
        return Err(ExtractError::NoImagesFound);
    }
    log::debug!(
        "Found {} images on sheet {:?}",
        images.len(),
        doc.active_sheet.name
    );
    Ok(images)
}
