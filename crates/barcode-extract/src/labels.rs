//! Label column extraction

use crate::types::*;
use crate::workbook::SpreadsheetDocument;
use calamine::{Data, Reader};

/// Column holding barcode labels (zero-based, fourth column)
pub const DEFAULT_COLUMN_INDEX: usize = 3;

/// Non-empty values of one column of the active sheet, in row order.
///
/// The first row of the used range is a header and is skipped. Missing
/// cells are dropped rather than kept as gaps, so labels pair with images
/// by position, not by row.
pub fn extract_labels(doc: &SpreadsheetDocument, column_index: usize) -> Result<Vec<String>> {
    let mut workbook = doc.workbook()?;
    let range = workbook
        .worksheet_range_at(doc.active_sheet.index)
        .ok_or_else(|| {
            ExtractError::corrupt(
                &doc.path,
                format!("sheet {:?} is not a worksheet", doc.active_sheet.name),
            )
        })?
        .map_err(|e| ExtractError::corrupt(&doc.path, e))?;

    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Err(ExtractError::ColumnOutOfRange {
            index: column_index,
            columns: 0,
        });
    };

    let columns = end.1 as usize + 1;
    if column_index >= columns {
        return Err(ExtractError::ColumnOutOfRange {
            index: column_index,
            columns,
        });
    }

    let labels: Vec<String> = (start.0 + 1..=end.0)
        .filter_map(|row| range.get_value((row, column_index as u32)))
        .filter_map(cell_text)
        .collect();

    log::debug!(
        "Read {} labels from column {column_index} of sheet {:?}",
        labels.len(),
        doc.active_sheet.name
    );
    Ok(labels)
}

/// Text of a cell, `None` for missing values.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|d| d.to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Whole numbers print without a fractional part.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
