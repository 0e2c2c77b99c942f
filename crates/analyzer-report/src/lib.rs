//! Report rendering for the box-office analyzer.
//!
//! Turns the immutable [`Report`] built by the data layer into a workbook,
//! a paginated PDF, or a plain-text summary for the terminal.

pub mod labels;
pub mod layout;
pub mod paginated;
pub mod sheet;
pub mod summary;
pub mod tables;
pub mod workbook;

pub use analyzer_core as core;

use std::path::{Path, PathBuf};

use analyzer_core::error::Result;
use analyzer_core::models::Report;
use chrono::NaiveDate;

/// An output format of the analysis.
pub trait ReportRenderer {
    /// File extension of the artifact, without the dot.
    fn extension(&self) -> &'static str;

    /// Write the artifact for `report` into `out_dir`, dated `date`, and
    /// return its path. Never mutates the report.
    fn render(&self, report: &Report, out_dir: &Path, date: NaiveDate) -> Result<PathBuf>;
}
