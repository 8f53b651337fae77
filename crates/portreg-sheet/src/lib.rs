//! Portreg Sheet - spreadsheet file I/O for the port registry
//!
//! - [`workbook`] - reading `.xlsx` rows for import and writing exports

pub mod workbook;

pub use workbook::{export_records, read_rows, resolve_export_path, write_records};
