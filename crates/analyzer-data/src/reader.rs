//! Spreadsheet discovery, loading and normalization.
//!
//! Turns one raw ticket-sales export into a [`NormalizedTable`]: header taken
//! from a fixed physical row, metadata and footer rows dropped, revenue and
//! attendance sub-columns detected, key columns title-cased and amounts
//! parsed.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::formatting::{parse_amount, title_case};
use analyzer_core::models::{CanonicalRecord, ColumnNames, ColumnSet, RawTable, SheetLayout};
use analyzer_core::office::OfficeSuite;
use thiserror::Error;
use tracing::{debug, warn};

/// Extension of the raw exports.
pub const SPREADSHEET_EXTENSION: &str = "xlsx";

// ── Public types ──────────────────────────────────────────────────────────────

/// One export after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    /// Revenue and attendance sub-columns found in the header.
    pub columns: ColumnSet,
    /// Every other named column except the three key columns.
    pub extra_columns: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

/// A table plus whether it needed the repair pass.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub table: NormalizedTable,
    pub repaired: bool,
}

/// Why a raw table could not be normalized.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("expected at least {needed} rows, found {found}")]
    TooFewRows { found: usize, needed: usize },

    #[error("missing required column \"{0}\"")]
    MissingColumn(String),

    #[error("column \"{column}\" row {row}: \"{value}\" is not a number")]
    NotANumber {
        column: String,
        row: usize,
        value: String,
    },
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find the `.xlsx` files directly inside `dir`, sorted by path.
///
/// Hidden files and office lock files (`~$name.xlsx`, `.~lock…`) are skipped.
pub fn find_spreadsheet_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Workspace does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_file()
                && !name.starts_with('.')
                && !name.starts_with("~$")
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(SPREADSHEET_EXTENSION))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read the first worksheet of `path` into a grid of cell texts.
///
/// A file that exists but cannot be opened as a workbook is a parse error.
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    if let Err(source) = std::fs::metadata(path) {
        return Err(AnalyzerError::FileRead {
            path: path.to_path_buf(),
            source,
        });
    }

    let book = umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| AnalyzerError::parse(path, format!("unreadable workbook: {}", e)))?;

    let sheet = book
        .get_sheet_collection()
        .first()
        .ok_or_else(|| AnalyzerError::parse(path, "workbook has no worksheets"))?;

    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let mut rows = Vec::with_capacity(max_row as usize);
    for row in 1..=max_row {
        let cells = (1..=max_col)
            .map(|col| {
                sheet
                    .get_cell((col, row))
                    .map(|cell| cell.get_value().trim().to_string())
                    .unwrap_or_default()
            })
            .collect();
        rows.push(cells);
    }

    debug!(
        path = %path.display(),
        rows = max_row,
        columns = max_col,
        "raw table read"
    );
    Ok(RawTable::new(rows))
}

/// Turn a raw grid into canonical records.
pub fn normalize_table(
    raw: &RawTable,
    names: &ColumnNames,
    layout: &SheetLayout,
) -> std::result::Result<NormalizedTable, NormalizeError> {
    let needed = layout.leading_rows.max(layout.header_row + 1) + layout.trailing_rows;
    if raw.len() < needed {
        return Err(NormalizeError::TooFewRows {
            found: raw.len(),
            needed,
        });
    }

    let header = header_names(&raw.rows[layout.header_row]);
    let position = |name: &str| {
        header
            .iter()
            .position(|h| h.as_deref() == Some(name))
            .ok_or_else(|| NormalizeError::MissingColumn(name.to_string()))
    };
    let city_idx = position(&names.city)?;
    let venue_idx = position(&names.venue)?;
    let title_idx = position(&names.title)?;

    let columns = ColumnSet::detect(header.iter().flatten().map(String::as_str));
    let extra_columns: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| ![city_idx, venue_idx, title_idx].contains(i))
        .filter_map(|(_, h)| h.clone())
        .filter(|h| !columns.contains(h))
        .collect();

    let data_end = raw.len() - layout.trailing_rows;
    let mut records = Vec::with_capacity(data_end.saturating_sub(layout.leading_rows));

    for (row_idx, row) in raw
        .rows
        .iter()
        .enumerate()
        .take(data_end)
        .skip(layout.leading_rows)
    {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let mut record = CanonicalRecord {
            city: title_case(cell(city_idx)),
            venue: title_case(cell(venue_idx)),
            title: title_case(cell(title_idx)),
            revenue: BTreeMap::new(),
            attendance: BTreeMap::new(),
            extra: BTreeMap::new(),
        };

        for (col_idx, name) in header.iter().enumerate() {
            let Some(name) = name else { continue };
            if col_idx == city_idx || col_idx == venue_idx || col_idx == title_idx {
                continue;
            }
            let text = cell(col_idx);
            let is_revenue = columns.revenue.contains(name);
            let is_attendance = columns.attendance.contains(name);
            if is_revenue || is_attendance {
                let value = parse_amount(text).ok_or_else(|| NormalizeError::NotANumber {
                    column: name.clone(),
                    row: row_idx,
                    value: text.to_string(),
                })?;
                if is_revenue {
                    record.revenue.insert(name.clone(), value);
                }
                if is_attendance {
                    record.attendance.insert(name.clone(), value);
                }
            } else {
                record.extra.insert(name.clone(), text.to_string());
            }
        }
        records.push(record);
    }

    Ok(NormalizedTable {
        columns,
        extra_columns,
        records,
    })
}

/// Read and normalize `path`.
pub fn read_table(path: &Path, names: &ColumnNames, layout: &SheetLayout) -> Result<NormalizedTable> {
    let raw = read_raw_table(path)?;
    normalize_table(&raw, names, layout).map_err(|e| AnalyzerError::parse(path, e.to_string()))
}

/// Read and normalize `path`, repairing the file once through `office` when
/// the first attempt fails to parse.
pub fn load_table(
    path: &Path,
    names: &ColumnNames,
    layout: &SheetLayout,
    office: &dyn OfficeSuite,
) -> Result<LoadedTable> {
    match read_table(path, names, layout) {
        Ok(table) => Ok(LoadedTable {
            path: path.to_path_buf(),
            table,
            repaired: false,
        }),
        Err(err) if err.is_parse() => {
            warn!(path = %path.display(), error = %err, "parse failed, repairing file");
            office.resave(path)?;
            let table = read_table(path, names, layout)?;
            Ok(LoadedTable {
                path: path.to_path_buf(),
                table,
                repaired: true,
            })
        }
        Err(err) => Err(err),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Column names from the header row. Blank cells yield `None`; repeated
/// names get a `.1`, `.2`… suffix.
fn header_names(row: &[String]) -> Vec<Option<String>> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    row.iter()
        .map(|cell| {
            if cell.is_empty() {
                return None;
            }
            let count = seen.entry(cell.as_str()).or_insert(0);
            let name = if *count == 0 {
                cell.clone()
            } else {
                format!("{}.{}", cell, count)
            };
            *count += 1;
            Some(name)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
