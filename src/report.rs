//! Two-sheet spreadsheet export of a filtered result.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{info, warn};

use crate::backend::{CellValue, ResultFrame};
use crate::error::DashError;
use crate::filter::FilterSet;

pub const REPORT_FILE_NAME: &str = "relatorio.xlsx";
pub const DATA_SHEET: &str = "Dados Filtrados";
pub const FILTER_SHEET: &str = "Filtros Aplicados";
pub const FILTER_HEADERS: [&str; 2] = ["Coluna", "Filtro Aplicado"];
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A written report, ready to hand back to the operator.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub data_rows: usize,
    pub filter_rows: usize,
}

fn export_error(e: XlsxError) -> DashError {
    DashError::Export {
        message: e.to_string(),
    }
}

fn row_index(idx: usize) -> Result<u32, DashError> {
    u32::try_from(idx).map_err(|_| DashError::Export {
        message: format!("row {} exceeds the worksheet limit", idx),
    })
}

fn col_index(idx: usize) -> Result<u16, DashError> {
    u16::try_from(idx).map_err(|_| DashError::Export {
        message: format!("column {} exceeds the worksheet limit", idx),
    })
}

/// Longest string a worksheet cell holds.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Largest integer magnitude an Excel number stores exactly (2^53).
const MAX_EXACT_INT: u64 = 1 << 53;

/// Clip text to the cell limit, warning when characters are dropped.
fn cell_text<'a>(text: &'a str, column: &str, row: u32) -> Cow<'a, str> {
    let chars = text.chars().count();
    if chars <= MAX_CELL_CHARS {
        return Cow::Borrowed(text);
    }
    warn!(
        column,
        row,
        chars,
        limit = MAX_CELL_CHARS,
        "text truncated to the worksheet cell limit"
    );
    Cow::Owned(text.chars().take(MAX_CELL_CHARS).collect())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    column: &str,
    cell: &CellValue,
    date_format: &Format,
    datetime_format: &Format,
) -> Result<(), XlsxError> {
    match cell {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        CellValue::Int(i) if i.unsigned_abs() <= MAX_EXACT_INT => {
            sheet.write_number(row, col, *i as f64)?;
        }
        // Beyond 2^53 a number cell would round, so keep the digits.
        CellValue::Int(i) => {
            sheet.write_string(row, col, i.to_string())?;
        }
        CellValue::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
        CellValue::Text(s) => {
            sheet.write_string(row, col, cell_text(s, column, row))?;
        }
        CellValue::Date(d) => {
            sheet.write_datetime_with_format(row, col, d, date_format)?;
        }
        CellValue::DateTime(dt) => {
            sheet.write_datetime_with_format(row, col, dt, datetime_format)?;
        }
    }
    Ok(())
}

/// Render the workbook in memory: the filtered rows with a header on the
/// first sheet, one `(column, description)` row per filter on the second.
pub fn render_workbook(frame: &ResultFrame, filters: &FilterSet) -> Result<Vec<u8>, DashError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let data = workbook.add_worksheet();
    data.set_name(DATA_SHEET).map_err(export_error)?;
    for (c, column) in frame.columns.iter().enumerate() {
        data.write_string_with_format(0, col_index(c)?, &column.name, &header)
            .map_err(export_error)?;
    }
    for (r, row) in frame.rows.iter().enumerate() {
        let excel_row = row_index(r + 1)?;
        for (c, (cell, column)) in row.iter().zip(&frame.columns).enumerate() {
            write_cell(
                data,
                excel_row,
                col_index(c)?,
                &column.name,
                cell,
                &date_format,
                &datetime_format,
            )
            .map_err(export_error)?;
        }
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(FILTER_SHEET).map_err(export_error)?;
    for (c, title) in FILTER_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col_index(c)?, *title, &header)
            .map_err(export_error)?;
    }
    for (r, (column, filter)) in filters.iter().enumerate() {
        let excel_row = row_index(r + 1)?;
        sheet.write_string(excel_row, 0, column).map_err(export_error)?;
        let description = filter.to_string();
        sheet
            .write_string(excel_row, 1, cell_text(&description, column, excel_row))
            .map_err(export_error)?;
    }

    workbook.save_to_buffer().map_err(export_error)
}

/// Render and write the report to `path`, replacing any existing file.
pub fn generate_report(
    frame: &ResultFrame,
    filters: &FilterSet,
    path: &Path,
) -> Result<ReportArtifact, DashError> {
    let bytes = render_workbook(frame, filters)?;
    std::fs::write(path, &bytes).map_err(|e| DashError::Export {
        message: format!("cannot write {}: {}", path.display(), e),
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| REPORT_FILE_NAME.to_string());

    info!(
        path = %path.display(),
        rows = frame.rows.len(),
        filters = filters.len(),
        bytes = bytes.len(),
        "report written"
    );

    Ok(ReportArtifact {
        path: path.to_path_buf(),
        file_name,
        mime_type: XLSX_MIME,
        bytes,
        data_rows: frame.rows.len(),
        filter_rows: filters.len(),
    })
}
