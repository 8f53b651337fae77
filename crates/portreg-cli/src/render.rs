//! Text rendering of listings.

use portreg_core::{PortField, PortPage, PortRecord};

const MAX_CELL_WIDTH: usize = 40;

/// Renders a page as an aligned table with a page footer.
pub fn format_page(page: &PortPage) -> String {
    if page.items.is_empty() {
        return "No port records found.".to_string();
    }

    let mut header = vec!["ID".to_string()];
    header.extend(PortField::ALL.iter().map(|f| f.header().to_string()));

    let rows: Vec<Vec<String>> = page.items.iter().map(row_cells).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format_line(&header, &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&format_line(row, &widths));
        out.push('\n');
    }
    out.push_str(&format!(
        "Page {}/{} ({} records)",
        page.page, page.page_count, page.total
    ));
    out
}

fn row_cells(record: &PortRecord) -> Vec<String> {
    let mut cells = vec![record.id.to_string()];
    cells.extend(
        PortField::ALL
            .iter()
            .map(|f| truncate_text(record.field(*f), MAX_CELL_WIDTH)),
    );
    cells
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Collapses whitespace and cuts to `max_len` characters, adding an
/// ellipsis if needed.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= max_len {
        cleaned
    } else {
        let cut: String = cleaned.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// One-record summary used in prompts and confirmations.
pub fn describe(record: &PortRecord) -> String {
    format!(
        "#{} port {} ({} / {})",
        record.id, record.port_number, record.project_name, record.application_name
    )
}
