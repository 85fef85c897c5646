//! Shared-strings case repair
//!
//! Some generators write the shared string table as `xl/SharedStrings.xml`
//! (or another casing). Readers look for `xl/sharedStrings.xml` exactly, so
//! such workbooks fail to load. The repair copies every entry into a new
//! archive unchanged, renaming only the mis-cased entry.

use crate::xml::{Relationship, parse_relationships};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::result::ZipResult;

pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_REL_TYPE: &str = "/sharedStrings";

/// Prefix marking a repaired sibling archive
pub const REPAIRED_PREFIX: &str = "fixed_";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SharedStrings {
    /// Workbook has no string table and none is referenced
    NotReferenced,
    /// Canonical entry present
    Present,
    /// Entry present under a different letter case
    Miscased(String),
    /// Workbook references a string table that is not in the archive
    Missing,
}

/// Classify the archive's shared-strings entry.
pub(crate) fn inspect<R: Read + Seek>(archive: &mut ZipArchive<R>) -> SharedStrings {
    // an exact match wins over other casings of the same name
    let found = archive
        .file_names()
        .filter(|name| name.eq_ignore_ascii_case(SHARED_STRINGS_PART))
        .max_by_key(|name| *name == SHARED_STRINGS_PART)
        .map(str::to_owned);

    match found {
        Some(name) if name == SHARED_STRINGS_PART => SharedStrings::Present,
        Some(name) => SharedStrings::Miscased(name),
        None if references_shared_strings(archive) => SharedStrings::Missing,
        None => SharedStrings::NotReferenced,
    }
}

fn references_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> bool {
    let Ok(mut entry) = archive.by_name(WORKBOOK_RELS_PART) else {
        return false;
    };
    let mut xml = String::new();
    if entry.read_to_string(&mut xml).is_err() {
        return false;
    }
    parse_relationships(&xml)
        .map(|rels| rels.iter().any(is_shared_strings_rel))
        .unwrap_or(false)
}

fn is_shared_strings_rel(rel: &Relationship) -> bool {
    rel.rel_type.ends_with(SHARED_STRINGS_REL_TYPE)
        || rel.target.to_ascii_lowercase().ends_with("sharedstrings.xml")
}

/// Rebuild `bytes` with the entry `from` renamed to the canonical name.
///
/// Entries are copied raw, so compressed data is not re-encoded.
pub(crate) fn repack(bytes: &[u8], from: &str) -> ZipResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.name() == from {
            writer.raw_copy_file_rename(entry, SHARED_STRINGS_PART.to_string())?;
        } else {
            writer.raw_copy_file(entry)?;
        }
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(names: &[&str]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in names {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"<sst/>").unwrap();
        }
        let bytes = writer.finish().unwrap().into_inner();
        ZipArchive::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn miscased_entry_is_detected() {
        let mut zip = archive(&["xl/workbook.xml", "xl/SharedStrings.xml"]);
        assert_eq!(
            inspect(&mut zip),
            SharedStrings::Miscased("xl/SharedStrings.xml".to_string())
        );
    }

    #[test]
    fn canonical_entry_wins_over_other_casing() {
        let mut zip = archive(&["xl/SharedStrings.xml", "xl/sharedStrings.xml"]);
        assert_eq!(inspect(&mut zip), SharedStrings::Present);

        let mut zip = archive(&["xl/sharedStrings.xml", "xl/SHAREDSTRINGS.XML"]);
        assert_eq!(inspect(&mut zip), SharedStrings::Present);
    }

    #[test]
    fn absent_table_without_reference() {
        let mut zip = archive(&["xl/workbook.xml"]);
        assert_eq!(inspect(&mut zip), SharedStrings::NotReferenced);
    }
}
