//! Opening and validating spreadsheet archives

use crate::repair::{self, REPAIRED_PREFIX, SharedStrings};
use crate::types::*;
use crate::xml::{parse_relationships, parse_workbook, rels_path_for, resolve_target};
use barcode_store::{AssetRepository, has_extension};
use calamine::{Reader, Xlsx};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

pub const SPREADSHEET_EXTENSION: &str = ".xlsx";

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// The sheet the extractor reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSheet {
    /// Position in workbook order
    pub index: usize,
    pub name: String,
    /// Archive part holding the sheet, e.g. `xl/worksheets/sheet1.xml`
    pub part: String,
}

/// A validated `.xlsx` archive held in memory.
#[derive(Debug, Clone)]
pub struct SpreadsheetDocument {
    /// Path the caller asked for
    pub source_path: PathBuf,
    /// Path actually read; the repaired sibling when a repair happened
    pub path: PathBuf,
    pub active_sheet: ActiveSheet,
    pub repaired: bool,
    bytes: Vec<u8>,
}

impl SpreadsheetDocument {
    pub(crate) fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| ExtractError::corrupt(&self.path, e))
    }

    pub(crate) fn workbook(&self) -> Result<Xlsx<Cursor<&[u8]>>> {
        Xlsx::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| ExtractError::corrupt(&self.path, e))
    }

    /// Read one archive part, `None` when the archive lacks it.
    pub(crate) fn read_part(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = self.archive()?;
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(ExtractError::corrupt(&self.path, format!("{name}: {e}"))),
        };
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| ExtractError::corrupt(&self.path, format!("{name}: {e}")))?;
        Ok(Some(data))
    }

    pub(crate) fn read_xml_part(&self, name: &str) -> Result<Option<String>> {
        match self.read_part(name)? {
            Some(data) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| ExtractError::corrupt(&self.path, format!("{name}: {e}"))),
            None => Ok(None),
        }
    }
}

/// Open a spreadsheet, repairing a mis-cased shared-strings entry if needed.
///
/// A repair writes `fixed_<name>` next to the original and the returned
/// document reads from that sibling.
pub fn open(repo: &dyn AssetRepository, path: impl AsRef<Path>) -> Result<SpreadsheetDocument> {
    let source_path = path.as_ref().to_path_buf();

    if !repo.exists(&source_path) {
        return Err(ExtractError::NotFound(source_path));
    }
    if !has_extension(&source_path, &[SPREADSHEET_EXTENSION]) {
        return Err(ExtractError::UnsupportedFormat(source_path));
    }

    let mut bytes = repo.read(&source_path)?;
    let mut path = source_path.clone();
    let mut repaired = false;

    let shared_strings = {
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| ExtractError::corrupt(&path, e))?;
        repair::inspect(&mut archive)
    };

    match shared_strings {
        SharedStrings::Present | SharedStrings::NotReferenced => {}
        SharedStrings::Missing => return Err(ExtractError::MissingSharedStrings(path)),
        SharedStrings::Miscased(found) => {
            log::info!(
                "Repairing shared strings entry {found:?} in {}",
                source_path.display()
            );
            let fixed = repair::repack(&bytes, &found)
                .map_err(|e| ExtractError::corrupt(&path, e))?;
            path = repaired_path(&source_path);
            repo.write(&path, &fixed)?;
            bytes = fixed;
            repaired = true;
        }
    }

    let mut doc = SpreadsheetDocument {
        source_path,
        path,
        active_sheet: ActiveSheet {
            index: 0,
            name: String::new(),
            part: String::new(),
        },
        repaired,
        bytes,
    };

    // calamine must accept the workbook before anything is extracted
    doc.workbook()?;

    doc.active_sheet = locate_active_sheet(&doc)?;
    log::debug!(
        "Opened {} (active sheet {:?})",
        doc.path.display(),
        doc.active_sheet.name
    );
    Ok(doc)
}

/// Sibling path used for a repaired archive.
pub fn repaired_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{REPAIRED_PREFIX}{name}"))
}

fn locate_active_sheet(doc: &SpreadsheetDocument) -> Result<ActiveSheet> {
    let workbook_xml = doc
        .read_xml_part(WORKBOOK_PART)?
        .ok_or_else(|| ExtractError::corrupt(&doc.path, "missing xl/workbook.xml"))?;
    let info = parse_workbook(&workbook_xml).map_err(|e| ExtractError::corrupt(&doc.path, e))?;

    if info.sheets.is_empty() {
        return Err(ExtractError::corrupt(&doc.path, "workbook has no sheets"));
    }
    let index = info.active_tab.min(info.sheets.len() - 1);
    let sheet = &info.sheets[index];

    let rels_part = rels_path_for(WORKBOOK_PART);
    let rels_xml = doc
        .read_xml_part(&rels_part)?
        .ok_or_else(|| ExtractError::corrupt(&doc.path, format!("missing {rels_part}")))?;
    let rels = parse_relationships(&rels_xml).map_err(|e| ExtractError::corrupt(&doc.path, e))?;

    let target = rels
        .iter()
        .find(|r| r.id == sheet.rel_id)
        .map(|r| resolve_target(WORKBOOK_PART, &r.target))
        .ok_or_else(|| {
            ExtractError::corrupt(
                &doc.path,
                format!("sheet {:?} has no relationship {:?}", sheet.name, sheet.rel_id),
            )
        })?;

    Ok(ActiveSheet {
        index,
        name: sheet.name.clone(),
        part: target,
    })
}
