//! Minimal readers for the OOXML parts the extractor needs
//!
//! Only three shapes matter: relationship lists, the workbook sheet list,
//! and the picture anchors of a sheet drawing.

use quick_xml::Reader;
use quick_xml::events::Event;

type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SheetEntry {
    pub name: String,
    pub rel_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct WorkbookInfo {
    pub sheets: Vec<SheetEntry>,
    /// `workbookView/@activeTab`, 0 when absent
    pub active_tab: usize,
}

pub(crate) fn parse_relationships(xml: &str) -> XmlResult<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in e.attributes().flatten() {
                    let value = attr.decode_and_unescape_value(&reader)?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

pub(crate) fn parse_workbook(xml: &str) -> XmlResult<WorkbookInfo> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut info = WorkbookInfo::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = String::new();
                    let mut rel_id = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.local_name().as_ref() {
                            b"name" => name = attr.decode_and_unescape_value(&reader)?.into_owned(),
                            b"id" => rel_id = attr.decode_and_unescape_value(&reader)?.into_owned(),
                            _ => {}
                        }
                    }
                    info.sheets.push(SheetEntry { name, rel_id });
                }
                b"workbookView" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"activeTab" {
                            info.active_tab = attr.decode_and_unescape_value(&reader)?.trim().parse().unwrap_or(0);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(info)
}

/// Relationship ids of the pictures in a drawing, in anchor order.
pub(crate) fn parse_drawing_pictures(xml: &str) -> XmlResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut embeds = Vec::new();
    let mut in_pic = false;
    let mut current = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"pic" => {
                in_pic = true;
                current = None;
            }
            Event::Start(e) | Event::Empty(e) if in_pic && e.local_name().as_ref() == b"blip" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"embed" {
                        current = Some(attr.decode_and_unescape_value(&reader)?.into_owned());
                    }
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"pic" => {
                in_pic = false;
                if let Some(id) = current.take() {
                    embeds.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(embeds)
}

/// Resolve a relationship target against the part that owns it.
///
/// `resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml")`
/// gives `xl/drawings/drawing1.xml`. Absolute targets start at the archive
/// root.
pub(crate) fn resolve_target(owner_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute.split('/').collect());
    }
    let mut segments: Vec<&str> = owner_part.split('/').collect();
    // drop the owner's file name
    segments.pop();
    segments.extend(target.split('/'));
    normalize(segments)
}

fn normalize(segments: Vec<&str>) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());
    for seg in segments {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// Path of the `.rels` part describing `part`'s relationships.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}
