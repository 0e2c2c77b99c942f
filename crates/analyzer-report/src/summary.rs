//! Plain-text rendition of a report for the terminal.
//!
//! Each table becomes a titled block of aligned columns; the total row of a
//! venue detail is set off by a rule.

use analyzer_core::formatting::{format_currency, format_number};
use analyzer_core::models::Report;
use unicode_width::UnicodeWidthStr;

use crate::labels::Labels;
use crate::tables::{report_tables, CellValue, ReportTable};

const COLUMN_GAP: &str = "  ";

/// Render every table of `report`, separated by blank lines.
pub fn render_summary(report: &Report, labels: &Labels) -> String {
    report_tables(report, labels)
        .iter()
        .map(render_table)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one table with its title, header, rows and, when present, a rule
/// above the total row.
pub fn render_table(table: &ReportTable) -> String {
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect();

    let columns = table.header.len();
    let mut widths: Vec<usize> = table.header.iter().map(|h| h.width()).collect();
    for row in &body {
        for (c, text) in row.iter().enumerate().take(columns) {
            widths[c] = widths[c].max(text.width());
        }
    }

    let mut out = String::new();
    out.push_str(&table.title);
    out.push('\n');
    out.push_str(&format_row(&table.header, &widths, table));
    out.push('\n');
    out.push_str(&rule(&widths));
    out.push('\n');

    let total_row = table.total_row();
    for (r, row) in body.iter().enumerate() {
        if total_row == Some(r) {
            out.push_str(&rule(&widths));
            out.push('\n');
        }
        out.push_str(&format_row(row, &widths, table));
        out.push('\n');
    }
    out
}

/// Text of a cell. Multi-line titles are flattened to one line.
fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Text(text) => text.replace('\n', " "),
        CellValue::Amount(amount) => format_currency(*amount),
        CellValue::Count(count) => format_number(*count, 0),
    }
}

fn format_row(cells: &[String], widths: &[usize], table: &ReportTable) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(c, (text, &width))| {
            let pad = " ".repeat(width.saturating_sub(text.width()));
            if is_numeric_column(table, c) {
                format!("{}{}", pad, text)
            } else {
                format!("{}{}", text, pad)
            }
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

/// Columns whose data cells are numbers are right-aligned.
fn is_numeric_column(table: &ReportTable, column: usize) -> bool {
    table.rows.iter().any(|cells| {
        matches!(
            cells.get(column),
            Some(CellValue::Amount(_)) | Some(CellValue::Count(_))
        )
    })
}

fn rule(widths: &[usize]) -> String {
    let total = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
    "-".repeat(total)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
