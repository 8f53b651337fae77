//! Import reconciliation: loosely typed rows → id-less port records.
//!
//! Rows come from spreadsheets or other tabular sources where the header
//! names vary. Each logical field accepts several column names (see
//! [`PortField::aliases`]); a field with no matching column becomes an
//! empty string.
//!
//! Imported rows are NOT validated. A row with blank or malformed values is
//! kept as is, so that bulk data is never silently dropped; fixing it is
//! left to a later edit.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{NewPortRecord, PortField};
use crate::ports::{Notification, NotificationPort};
use crate::registry::PortRegistry;
use crate::sync::ImportSummary;

/// One tabular row keyed by column header.
pub type Row = Map<String, Value>;

/// Renders a cell as the string stored in a record.
///
/// Whole numbers drop their fractional part, since spreadsheet engines
/// store every number as a float (`7000.0` becomes `"7000"`).
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Reads one logical field from a row, trying each alias in order.
///
/// Header names are compared after trimming surrounding whitespace. The
/// first alias with a non-empty value wins.
pub fn lookup(row: &Row, field: PortField) -> String {
    for alias in field.aliases() {
        let hit = row
            .iter()
            .find(|(key, _)| key.trim() == *alias)
            .map(|(_, value)| cell_text(value));
        if let Some(text) = hit {
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Converts one row into a candidate record.
pub fn row_to_candidate(row: &Row) -> NewPortRecord {
    NewPortRecord {
        port_number: lookup(row, PortField::PortNumber),
        project_name: lookup(row, PortField::ProjectName),
        application_name: lookup(row, PortField::ApplicationName),
        description: lookup(row, PortField::Description),
    }
}

/// Converts rows into candidates, keeping their order.
pub fn rows_to_candidates(rows: &[Row]) -> Vec<NewPortRecord> {
    rows.iter().map(row_to_candidate).collect()
}

/// Imports rows into a registry and reports the result once.
///
/// Emits exactly one notification: the import summary on success, or the
/// failure otherwise.
///
/// # Errors
///
/// Returns `AppError::EmptyInput` if `rows` is empty; nothing is merged in
/// that case. Errors from the registry are passed through.
pub async fn import_rows(
    registry: &dyn PortRegistry,
    rows: &[Row],
    notifier: &dyn NotificationPort,
) -> Result<ImportSummary, AppError> {
    if rows.is_empty() {
        let err = AppError::EmptyInput("the sheet has no data rows".to_string());
        notifier.notify(Notification::warn("Import skipped", err.user_message()));
        return Err(err);
    }

    let candidates = rows_to_candidates(rows);
    let incomplete = candidates
        .iter()
        .filter(|c| crate::validation::validate(c).is_err())
        .count();
    if incomplete > 0 {
        warn!(incomplete, "importing rows that fail manual-entry validation");
    }

    match registry.import(candidates).await {
        Ok(summary) => {
            info!(
                merged = summary.merged_count(),
                failed = summary.failed_count(),
                "import finished"
            );
            notifier.notify(summary.notification());
            Ok(summary)
        }
        Err(e) => {
            notifier.notify(Notification::error("Import failed", e.user_message()));
            Err(e)
        }
    }
}
