//! Paginated output: one printed page per table, exported to PDF.
//!
//! The pages are laid out as a print workbook (one sheet per page, title
//! line, highlighted bold header, small fonts) and handed to the office
//! suite for the PDF conversion.

use std::path::{Path, PathBuf};

use analyzer_core::cancel::CancelFlag;
use analyzer_core::error::Result;
use analyzer_core::models::Report;
use analyzer_core::office::OfficeSuite;
use analyzer_core::progress::{venue_message, ProgressReporter};
use analyzer_core::time_utils::artifact_file_name;
use chrono::NaiveDate;
use tracing::info;
use umya_spreadsheet::Spreadsheet;

use crate::labels::Labels;
use crate::sheet::{SheetStyle, HEADER_FILL};
use crate::tables::{report_tables, ReportTable};
use crate::workbook::{build_book, write_book};
use crate::ReportRenderer;

/// Scratch directory, inside the output directory, for the print workbook.
const PRINT_DIR: &str = ".print";

/// Renders a [`Report`] to `Analysis_DD_MM_YYYY.pdf`.
pub struct PaginatedRenderer<'a> {
    labels: &'a Labels,
    office: &'a dyn OfficeSuite,
    progress: &'a dyn ProgressReporter,
    cancel: &'a CancelFlag,
}

impl<'a> PaginatedRenderer<'a> {
    pub fn new(
        labels: &'a Labels,
        office: &'a dyn OfficeSuite,
        progress: &'a dyn ProgressReporter,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            labels,
            office,
            progress,
            cancel,
        }
    }

    /// Lay out the print workbook, one sheet per page.
    ///
    /// Reports progress before each venue page and stops with
    /// `Cancelled` as soon as the flag is raised.
    pub fn build(&self, report: &Report) -> Result<Spreadsheet> {
        let tables = report_tables(report, self.labels);
        build_book(&tables, |table| {
            if let Some(venue) = &table.venue {
                self.cancel.check()?;
                self.progress.report(&venue_message(venue));
            }
            Ok(print_style(table))
        })
    }
}

impl ReportRenderer for PaginatedRenderer<'_> {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, report: &Report, out_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let book = self.build(report)?;

        let scratch = out_dir.join(PRINT_DIR);
        std::fs::create_dir_all(&scratch)?;
        let print_path = scratch.join(artifact_file_name(date, "xlsx"));

        let result = write_book(&book, &print_path)
            .and_then(|()| self.office.export_pdf(&print_path, out_dir));
        let _ = std::fs::remove_dir_all(&scratch);

        let pdf = result?;
        info!(path = %pdf.display(), pages = book.get_sheet_collection().len(), "PDF written");
        Ok(pdf)
    }
}

fn print_style(table: &ReportTable) -> SheetStyle {
    SheetStyle {
        title_row: true,
        font_size: Some(table.kind.font_size()),
        header_fill: Some(HEADER_FILL),
        fit_page: true,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
