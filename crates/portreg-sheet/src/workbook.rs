//! `.xlsx` reading and writing.
//!
//! Import reads the first sheet only and treats its first row as headers.
//! Export writes one sheet with the localized headers used by the listing,
//! and leaves the record id out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use portreg_core::config::ExportConfig;
use portreg_core::error::AppError;
use portreg_core::models::{PortField, PortRecord};
use portreg_core::reconcile::Row;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::{Number, Value};
use tracing::{debug, info};

/// Reads the data rows of the first sheet, keyed by header.
///
/// Columns without a header are ignored. Rows whose cells are all empty
/// are skipped; a row with at least one value, whitespace included, is kept
/// even if none of its columns is a known field.
///
/// # Errors
///
/// Returns `AppError::Spreadsheet` if the file cannot be opened as a
/// workbook and `AppError::EmptyInput` if it has no sheets.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::EmptyInput("the workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::Spreadsheet(format!("{}: {}", sheet_name, e)))?;

    let rows = rows_from_range(&range);
    info!(
        "Read {} rows from sheet '{}' of {}",
        rows.len(),
        sheet_name,
        path.display()
    );
    Ok(rows)
}

fn rows_from_range(range: &Range<Data>) -> Vec<Row> {
    let mut lines = range.rows();
    let Some(header_cells) = lines.next() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let headers: Vec<Option<String>> = header_cells
        .iter()
        .map(|cell| {
            let name = match cell {
                Data::Empty => return None,
                other => other.to_string().trim().to_string(),
            };
            // First column wins when a header repeats
            (!name.is_empty() && seen.insert(name.clone())).then_some(name)
        })
        .collect();

    lines
        .filter_map(|cells| {
            let mut row = Row::new();
            let mut has_value = false;
            for (header, cell) in headers.iter().zip(cells) {
                let Some(header) = header else { continue };
                let value = cell_value(cell);
                // Whitespace is content; only absent or empty cells are blank
                has_value |= !matches!(&value, Value::Null)
                    && !matches!(&value, Value::String(s) if s.is_empty());
                row.insert(header.clone(), value);
            }
            has_value.then_some(row)
        })
        .collect()
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

/// Turns a user-supplied export name into a path.
///
/// `None` selects the configured default name. `.xlsx` is appended unless
/// the name already ends with it (in any case).
///
/// # Errors
///
/// Returns `AppError::InvalidFileName` for a blank name.
pub fn resolve_export_path(input: Option<&str>, config: &ExportConfig) -> Result<PathBuf, AppError> {
    let name = input.unwrap_or(config.default_file_name.as_str()).trim();
    if name.is_empty() {
        return Err(AppError::InvalidFileName(input.unwrap_or_default().to_string()));
    }
    if name.to_lowercase().ends_with(".xlsx") {
        Ok(PathBuf::from(name))
    } else {
        Ok(PathBuf::from(format!("{}.xlsx", name)))
    }
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Spreadsheet(e.to_string())
}

/// Writes records to a new workbook at `path`.
///
/// Returns the number of records written.
///
/// # Errors
///
/// Returns `AppError::EmptyInput` when `records` is empty, in which case no
/// file is created, and `AppError::Spreadsheet` if writing fails.
pub fn write_records(path: &Path, records: &[PortRecord], sheet_name: &str) -> Result<usize, AppError> {
    if records.is_empty() {
        return Err(AppError::EmptyInput("there are no records to export".to_string()));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(xlsx_error)?;

    for (col, field) in (0u16..).zip(PortField::ALL) {
        worksheet
            .write_string_with_format(0, col, field.header(), &header_format)
            .map_err(xlsx_error)?;
    }

    for (row, record) in (1u32..).zip(records) {
        for (col, field) in (0u16..).zip(PortField::ALL) {
            let value = record.field(field);
            if !value.is_empty() {
                worksheet.write_string(row, col, value).map_err(xlsx_error)?;
            }
        }
    }
    worksheet.autofit();

    workbook.save(path).map_err(xlsx_error)?;
    debug!(path = %path.display(), count = records.len(), "workbook saved");
    Ok(records.len())
}

/// Exports a collection: checks for data, resolves the name, writes.
///
/// The emptiness check comes first, so an empty collection never reaches
/// file-name handling.
pub fn export_records(
    records: &[PortRecord],
    file_name: Option<&str>,
    config: &ExportConfig,
) -> Result<PathBuf, AppError> {
    if records.is_empty() {
        return Err(AppError::EmptyInput("there are no records to export".to_string()));
    }
    let path = resolve_export_path(file_name, config)?;
    write_records(&path, records, &config.sheet_name)?;
    info!("Exported {} records to {}", records.len(), path.display());
    Ok(path)
}
