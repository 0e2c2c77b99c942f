//! Workbook output: one sheet per table of the report.

use std::path::{Path, PathBuf};

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::models::Report;
use analyzer_core::time_utils::artifact_file_name;
use chrono::NaiveDate;
use tracing::{debug, info};
use umya_spreadsheet::Spreadsheet;

use crate::labels::Labels;
use crate::layout::SheetNamer;
use crate::sheet::{write_table, SheetStyle};
use crate::tables::{report_tables, ReportTable};
use crate::ReportRenderer;

/// Renders a [`Report`] to `Analysis_DD_MM_YYYY.xlsx`.
pub struct WorkbookRenderer<'a> {
    labels: &'a Labels,
}

impl<'a> WorkbookRenderer<'a> {
    pub fn new(labels: &'a Labels) -> Self {
        Self { labels }
    }

    /// Build the in-memory workbook.
    pub fn build(&self, report: &Report) -> Result<Spreadsheet> {
        let tables = report_tables(report, self.labels);
        build_book(&tables, |_| Ok(SheetStyle::default()))
    }
}

impl ReportRenderer for WorkbookRenderer<'_> {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn render(&self, report: &Report, out_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let book = self.build(report)?;
        let path = out_dir.join(artifact_file_name(date, self.extension()));
        write_book(&book, &path)?;
        info!(path = %path.display(), "workbook written");
        Ok(path)
    }
}

/// A new workbook holding one sheet per table, named uniquely.
///
/// `prepare` runs before each table is written and picks its style; an
/// error from it aborts the build.
pub(crate) fn build_book<F>(tables: &[ReportTable], mut prepare: F) -> Result<Spreadsheet>
where
    F: FnMut(&ReportTable) -> Result<SheetStyle>,
{
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let mut namer = SheetNamer::new();

    for table in tables {
        let style = prepare(table)?;
        let name = namer.assign(&table.sheet_name, table.alt_sheet_name.as_deref());
        let sheet = book
            .new_sheet(name.as_str())
            .map_err(|e| AnalyzerError::Render(format!("cannot add sheet {}: {}", name, e)))?;
        let rows = write_table(sheet, table, &style);
        debug!(sheet = %name, rows, "sheet written");
    }
    Ok(book)
}

pub(crate) fn write_book(book: &Spreadsheet, path: &Path) -> Result<()> {
    umya_spreadsheet::writer::xlsx::write(book, path).map_err(|e| AnalyzerError::Spreadsheet {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
