//! Flattening a [`Report`] into the labelled tables both renderers draw.

use analyzer_core::models::{AggregateRow, Report};

use crate::labels::Labels;
use crate::layout::{wrap_title, TITLE_WIDTH};

/// What a table shows; decides its print font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Per-venue aggregate of the home city.
    Aggregate,
    /// Cross-city comparison.
    Comparison,
    /// Per-movie breakdown of one venue.
    Detail,
}

impl TableKind {
    /// Font size used on printed pages.
    pub fn font_size(self) -> f64 {
        match self {
            TableKind::Aggregate | TableKind::Comparison => 6.0,
            TableKind::Detail => 5.0,
        }
    }
}

/// One cell of a rendered table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    /// Money, two decimals.
    Amount(f64),
    /// Head count.
    Count(f64),
}

/// A table ready to be drawn: title, header and rows, all labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub kind: TableKind,
    /// Preferred sheet name.
    pub sheet_name: String,
    /// Sheet name to try when the preferred one is taken.
    pub alt_sheet_name: Option<String>,
    /// Page title.
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// `true` when the last row is a total and should stand out.
    pub has_total: bool,
    /// Venue shown by a detail table.
    pub venue: Option<String>,
}

impl ReportTable {
    /// Index of the total row, if any.
    pub fn total_row(&self) -> Option<usize> {
        if self.has_total && !self.rows.is_empty() {
            Some(self.rows.len() - 1)
        } else {
            None
        }
    }
}

/// Every table of `report` in rendering order: the home-city aggregate
/// (when the home city took part), the comparison, then one detail per venue.
pub fn report_tables(report: &Report, labels: &Labels) -> Vec<ReportTable> {
    let mut tables = Vec::with_capacity(report.venues.len() + 2);

    if let Some(home) = report.home() {
        tables.push(ReportTable {
            kind: TableKind::Aggregate,
            sheet_name: home.city.clone(),
            alt_sheet_name: None,
            title: labels.home_title.to_string(),
            header: to_strings(&labels.aggregate_header()),
            rows: home
                .rows
                .iter()
                .map(|row| aggregate_cells(row, row.label.clone(), labels))
                .collect(),
            has_total: false,
            venue: None,
        });
    }

    tables.push(ReportTable {
        kind: TableKind::Comparison,
        sheet_name: labels.other_cities.to_string(),
        alt_sheet_name: None,
        title: labels.comparison_title.to_string(),
        header: to_strings(&labels.comparison_header()),
        rows: report
            .comparison
            .iter()
            .map(|c| {
                let mut cells = vec![CellValue::Text(c.city.clone())];
                cells.extend(aggregate_cells(&c.row, c.row.label.clone(), labels));
                cells
            })
            .collect(),
        has_total: false,
        venue: None,
    });

    for detail in &report.venues {
        let mut rows: Vec<Vec<CellValue>> = detail
            .movies
            .iter()
            .map(|movie| aggregate_cells(movie, wrap_title(&movie.label, TITLE_WIDTH), labels))
            .collect();
        rows.push(aggregate_cells(
            &detail.total,
            labels.total.to_string(),
            labels,
        ));

        tables.push(ReportTable {
            kind: TableKind::Detail,
            sheet_name: detail.venue.clone(),
            alt_sheet_name: Some(format!("{} ({})", detail.venue, detail.city)),
            title: labels.venue_title(&detail.venue, &detail.city),
            header: to_strings(&labels.detail_header()),
            rows,
            has_total: true,
            venue: Some(detail.venue.clone()),
        });
    }

    tables
}

/// Cell for an average price; the not-available text when nobody attended.
pub fn price_cell(price: Option<f64>, labels: &Labels) -> CellValue {
    match price {
        Some(p) => CellValue::Amount(p),
        None => CellValue::Text(labels.not_available.to_string()),
    }
}

fn aggregate_cells(row: &AggregateRow, label: String, labels: &Labels) -> Vec<CellValue> {
    vec![
        CellValue::Text(label),
        CellValue::Amount(row.revenue),
        CellValue::Count(row.attendance),
        price_cell(row.average_price, labels),
    ]
}

fn to_strings(header: &[&str]) -> Vec<String> {
    header.iter().map(|h| h.to_string()).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
