//! Spreadsheet serialization: turn a [`TableDocument`] into XLSX bytes.
//!
//! One worksheet, header on row 0 in bold with the pane frozen below it,
//! data rows in source order, and each column sized to
//! [`TableDocument::column_widths`]. The workbook is built entirely in memory
//! and returned as bytes; writing it anywhere is the caller's business.

use crate::error::WorkflowError;
use crate::pipeline::extract::TableDocument;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::debug;

/// Excel worksheet maximum row count.
pub const MAX_ROWS: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const MAX_COLS: usize = 16_384;
/// Excel sheet name maximum length.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Excel column width bounds, in characters.
const MIN_COLUMN_WIDTH: usize = 1;
const MAX_COLUMN_WIDTH: usize = 255;

const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// MIME type of an XLSX workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serialize `doc` into a single-sheet workbook.
///
/// Every failure maps to [`WorkflowError::Conversion`]; the underlying cause
/// is kept in `detail` for logging.
pub fn build_workbook(doc: &TableDocument, sheet_name: &str) -> Result<Vec<u8>, WorkflowError> {
    let columns = doc.columns();
    if columns.len() > MAX_COLS {
        return Err(WorkflowError::Conversion {
            detail: format!("{} columns exceed the sheet limit of {MAX_COLS}", columns.len()),
        });
    }
    // +1 for the header row.
    if doc.rows.len() + 1 > MAX_ROWS {
        return Err(WorkflowError::Conversion {
            detail: format!(
                "{} rows exceed the sheet limit of {}",
                doc.rows.len(),
                MAX_ROWS - 1
            ),
        });
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sanitize_sheet_name(sheet_name))
        .map_err(conversion_error)?;

    // Both limits were checked above, so the casts below cannot truncate.
    for (col, name) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, &header_format)
            .map_err(conversion_error)?;
    }

    for (idx, row) in doc.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let value = row.get(name).unwrap_or("");
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string(row_num, col as u16, value)
                .map_err(conversion_error)?;
        }
    }

    for (col, width) in doc.column_widths().into_iter().enumerate() {
        worksheet
            .set_column_width(col as u16, sheet_column_width(width))
            .map_err(conversion_error)?;
    }

    if !columns.is_empty() {
        worksheet.set_freeze_panes(1, 0).map_err(conversion_error)?;
    }

    let bytes = workbook.save_to_buffer().map_err(conversion_error)?;
    debug!(
        "Built workbook: {} columns, {} rows, {} bytes",
        columns.len(),
        doc.rows.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Content width clamped to what Excel accepts. A zero width would hide
/// the column.
fn sheet_column_width(width: usize) -> f64 {
    width.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) as f64
}

/// Make `name` acceptable as an Excel sheet name.
///
/// Illegal characters become `_`, surrounding whitespace and apostrophes are
/// trimmed, an empty result becomes `Sheet`, and the name is cut to 31
/// characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SHEET_NAME_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    if trimmed.is_empty() {
        return "Sheet".to_string();
    }
    trimmed.chars().take(MAX_SHEET_NAME_LEN).collect()
}

fn conversion_error(err: XlsxError) -> WorkflowError {
    WorkflowError::Conversion {
        detail: format!("xlsx write error: {err}"),
    }
}
