//! Main analysis pipeline.
//!
//! Loads every export of a workspace, merges and resolves them, and builds
//! the [`Report`] ready for the renderers.

use std::path::Path;

use analyzer_core::cancel::CancelFlag;
use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::models::Report;
use analyzer_core::office::OfficeSuite;
use analyzer_core::registry::AnalyzerConfig;
use chrono::Utc;
use tracing::info;

use crate::aggregator::Aggregator;
use crate::merger::merge;
use crate::reader::{find_spreadsheet_files, load_table};
use crate::resolver::resolve;

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the report.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of export files read.
    pub files_processed: usize,
    /// Files that needed the office-suite repair pass.
    pub files_repaired: usize,
    /// Distinct records kept after merging.
    pub records_merged: usize,
    /// Venues with a detail table.
    pub venues_resolved: usize,
    /// Wall-clock seconds spent reading the files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent merging and aggregating.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_workspace`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub report: Report,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline over the exports in `dir`.
///
/// 1. Load and normalize every `.xlsx` file, repairing unreadable ones once.
/// 2. Merge them into one deduplicated dataset.
/// 3. Resolve venues against the registry.
/// 4. Aggregate into a [`Report`].
///
/// Returns [`AnalyzerError::EmptyInput`] when `dir` holds no exports and
/// [`AnalyzerError::Cancelled`] when `cancel` fires between stages.
pub fn analyze_workspace(
    dir: &Path,
    config: &AnalyzerConfig,
    office: &dyn OfficeSuite,
    cancel: &CancelFlag,
) -> Result<AnalysisResult> {
    let files = find_spreadsheet_files(dir);
    if files.is_empty() {
        return Err(AnalyzerError::EmptyInput(dir.to_path_buf()));
    }

    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let mut tables = Vec::with_capacity(files.len());
    let mut files_repaired = 0usize;
    for path in &files {
        cancel.check()?;
        let loaded = load_table(path, &config.columns, &config.layout, office)?;
        if loaded.repaired {
            files_repaired += 1;
        }
        tables.push(loaded.table);
    }
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2–4: Merge, resolve, aggregate ───────────────────────────────────
    cancel.check()?;
    let aggregate_start = std::time::Instant::now();
    let dataset = merge(tables, &config.registry);

    cancel.check()?;
    let resolved = resolve(&dataset, &config.registry);

    cancel.check()?;
    let report = Aggregator::build_report(&resolved);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        files_processed: files.len(),
        files_repaired,
        records_merged: dataset.len(),
        venues_resolved: report.venues.len(),
        load_time_seconds: load_time,
        aggregate_time_seconds: aggregate_time,
    };

    info!(
        files = metadata.files_processed,
        repaired = metadata.files_repaired,
        records = metadata.records_merged,
        venues = metadata.venues_resolved,
        "analysis complete"
    );

    Ok(AnalysisResult { report, metadata })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
