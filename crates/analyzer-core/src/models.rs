use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Raw table shape ───────────────────────────────────────────────────────────

/// Position of the header and of the non-data rows in an exported sheet.
///
/// Row indices are zero-based physical rows of the first worksheet. The
/// header row is counted among the leading rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Physical row holding the column names.
    pub header_row: usize,
    /// Rows dropped from the top of the sheet (metadata and header).
    pub leading_rows: usize,
    /// Rows dropped from the bottom of the sheet (footer totals).
    pub trailing_rows: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 1,
            leading_rows: 2,
            trailing_rows: 2,
        }
    }
}

/// Names of the three key columns in the ticket-sales export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub city: String,
    pub venue: String,
    pub title: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            city: "Città".to_string(),
            venue: "Cinema".to_string(),
            title: "Titolo Film".to_string(),
        }
    }
}

/// One spreadsheet file as a grid of cell texts, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Physical rows, each padded to the same width.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Schema detection ──────────────────────────────────────────────────────────

/// Revenue and attendance sub-columns discovered in an export.
///
/// The set varies per export (one column per day or per show), so it is
/// detected from the header names instead of being fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub revenue: Vec<String>,
    pub attendance: Vec<String>,
}

impl ColumnSet {
    /// Marker searched in the first whitespace-delimited token of a header.
    pub const REVENUE_MARKER: &'static str = "Incass";
    /// Marker searched anywhere in a header.
    pub const ATTENDANCE_MARKER: &'static str = "Presenz";

    /// Classify every header; a header may land in both lists.
    pub fn detect<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for header in headers {
            if Self::is_revenue(header) && !set.revenue.iter().any(|c| c == header) {
                set.revenue.push(header.to_string());
            }
            if Self::is_attendance(header) && !set.attendance.iter().any(|c| c == header) {
                set.attendance.push(header.to_string());
            }
        }
        set
    }

    pub fn is_revenue(header: &str) -> bool {
        header
            .split_whitespace()
            .next()
            .is_some_and(|token| token.contains(Self::REVENUE_MARKER))
    }

    pub fn is_attendance(header: &str) -> bool {
        header.contains(Self::ATTENDANCE_MARKER)
    }

    /// `true` when `header` is a revenue or attendance sub-column.
    pub fn contains(&self, header: &str) -> bool {
        self.revenue.iter().any(|c| c == header) || self.attendance.iter().any(|c| c == header)
    }

    /// Append the columns of `other` not yet present, keeping first-seen order.
    pub fn union_with(&mut self, other: &ColumnSet) {
        for col in &other.revenue {
            if !self.revenue.contains(col) {
                self.revenue.push(col.clone());
            }
        }
        for col in &other.attendance {
            if !self.attendance.contains(col) {
                self.attendance.push(col.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.revenue.is_empty() && self.attendance.is_empty()
    }
}

// ── Canonical records ─────────────────────────────────────────────────────────

/// One cleaned row of a ticket-sales export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Title-cased city name.
    pub city: String,
    /// Title-cased venue name.
    pub venue: String,
    /// Title-cased movie title.
    pub title: String,
    /// Revenue sub-column → amount.
    pub revenue: BTreeMap<String, f64>,
    /// Attendance sub-column → head count.
    pub attendance: BTreeMap<String, f64>,
    /// Every other column, as text.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Hashable, totally ordered identity of a [`CanonicalRecord`], used for
/// exact-duplicate elimination and for a canonical record order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    city: String,
    venue: String,
    title: String,
    revenue: Vec<(String, u64)>,
    attendance: Vec<(String, u64)>,
    extra: Vec<(String, String)>,
}

impl CanonicalRecord {
    /// Sum of every revenue sub-column.
    pub fn total_revenue(&self) -> f64 {
        self.revenue.values().sum()
    }

    /// Sum of every attendance sub-column.
    pub fn total_attendance(&self) -> f64 {
        self.attendance.values().sum()
    }

    /// Fill the sub-columns and extra columns this record lacks: zero for
    /// numbers, empty text for the rest.
    pub fn align_to(&mut self, columns: &ColumnSet, extra_columns: &[String]) {
        for col in &columns.revenue {
            self.revenue.entry(col.clone()).or_insert(0.0);
        }
        for col in &columns.attendance {
            self.attendance.entry(col.clone()).or_insert(0.0);
        }
        for col in extra_columns {
            self.extra.entry(col.clone()).or_default();
        }
    }

    pub fn key(&self) -> RecordKey {
        // 0.0 and -0.0 compare equal, so they must hash equal too.
        fn bits(v: f64) -> u64 {
            if v == 0.0 {
                0.0f64.to_bits()
            } else {
                v.to_bits()
            }
        }

        RecordKey {
            city: self.city.clone(),
            venue: self.venue.clone(),
            title: self.title.clone(),
            revenue: self.revenue.iter().map(|(k, v)| (k.clone(), bits(*v))).collect(),
            attendance: self
                .attendance
                .iter()
                .map(|(k, v)| (k.clone(), bits(*v)))
                .collect(),
            extra: self
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

// ── Aggregates ────────────────────────────────────────────────────────────────

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average ticket price, `None` when nobody attended.
pub fn average_price(revenue: f64, attendance: f64) -> Option<f64> {
    if attendance == 0.0 {
        None
    } else {
        Some(round2(revenue / attendance))
    }
}

/// A labelled revenue / attendance / average-price triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Venue name or movie title.
    pub label: String,
    /// Total revenue, rounded to cents.
    pub revenue: f64,
    /// Total attendance.
    pub attendance: f64,
    /// `revenue / attendance` rounded to cents; `None` for zero attendance.
    pub average_price: Option<f64>,
}

impl AggregateRow {
    /// Build a row from unrounded totals.
    pub fn from_totals(label: impl Into<String>, revenue: f64, attendance: f64) -> Self {
        Self {
            label: label.into(),
            revenue: round2(revenue),
            attendance,
            average_price: average_price(revenue, attendance),
        }
    }
}

/// Per-venue aggregate rows of one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityAggregate {
    pub city: String,
    /// Sorted by attendance, descending.
    pub rows: Vec<AggregateRow>,
}

impl CityAggregate {
    pub fn row(&self, venue: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.label == venue)
    }
}

/// A venue row of the cross-city comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub city: String,
    pub row: AggregateRow,
}

/// Per-movie breakdown of one venue plus its total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDetail {
    pub venue: String,
    /// City of the first row observed for the venue.
    pub city: String,
    /// One row per distinct title, sorted by attendance, descending.
    pub movies: Vec<AggregateRow>,
    /// Grand total of the venue; always rendered last.
    pub total: AggregateRow,
}

impl VenueDetail {
    /// Movie rows followed by the total row.
    pub fn rows(&self) -> impl Iterator<Item = &AggregateRow> {
        self.movies.iter().chain(std::iter::once(&self.total))
    }
}

/// Everything the renderers need, computed once per batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Name of the city whose aggregate gets its own table.
    pub home_city: String,
    /// One aggregate per city with at least one resolved venue.
    pub cities: Vec<CityAggregate>,
    /// Cross-city comparison, sorted by average price, descending.
    pub comparison: Vec<ComparisonRow>,
    /// Venue details in rendering order.
    pub venues: Vec<VenueDetail>,
}

impl Report {
    /// Aggregate of the home city, when it took part in the batch.
    pub fn home(&self) -> Option<&CityAggregate> {
        self.cities.iter().find(|c| c.city == self.home_city)
    }

    pub fn city(&self, name: &str) -> Option<&CityAggregate> {
        self.cities.iter().find(|c| c.city == name)
    }

    pub fn venue(&self, name: &str) -> Option<&VenueDetail> {
        self.venues.iter().find(|v| v.venue == name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(venue: &str, revenue: f64, attendance: f64) -> CanonicalRecord {
        CanonicalRecord {
            city: "Roma".to_string(),
            venue: venue.to_string(),
            title: "Il Sorpasso".to_string(),
            revenue: BTreeMap::from([("Incassi Lun".to_string(), revenue)]),
            attendance: BTreeMap::from([("Presenze Lun".to_string(), attendance)]),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_column_set_detect() {
        let headers = [
            "Città",
            "Cinema",
            "Titolo Film",
            "Incassi Lunedì",
            "Incasso Martedì",
            "Presenze Lunedì",
            "Tot Presenze",
            "Totale Incassi",
        ];
        let set = ColumnSet::detect(headers);
        assert_eq!(set.revenue, vec!["Incassi Lunedì", "Incasso Martedì"]);
        assert_eq!(set.attendance, vec!["Presenze Lunedì", "Tot Presenze"]);
    }

    #[test]
    fn test_column_set_revenue_marker_only_in_first_token() {
        assert!(ColumnSet::is_revenue("Incassi"));
        assert!(!ColumnSet::is_revenue("Totale Incassi"));
        assert!(!ColumnSet::is_revenue(""));
    }

    #[test]
    fn test_column_set_union_keeps_first_seen_order() {
        let mut a = ColumnSet::detect(["Incassi Lun", "Presenze Lun"]);
        let b = ColumnSet::detect(["Incassi Mar", "Incassi Lun", "Presenze Mar"]);
        a.union_with(&b);
        assert_eq!(a.revenue, vec!["Incassi Lun", "Incassi Mar"]);
        assert_eq!(a.attendance, vec!["Presenze Lun", "Presenze Mar"]);
    }

    #[test]
    fn test_average_price_zero_attendance_is_none() {
        assert_eq!(average_price(0.0, 0.0), None);
        assert_eq!(average_price(150.0, 15.0), Some(10.0));
        assert_eq!(average_price(10.0, 3.0), Some(3.33));
    }

    #[test]
    fn test_aggregate_row_rounds_revenue() {
        let row = AggregateRow::from_totals("Troisi", 100.005_1, 10.0);
        assert_eq!(row.revenue, 100.01);
        assert_eq!(row.average_price, Some(10.0));
    }

    #[test]
    fn test_record_totals() {
        let mut r = record("Troisi", 10.0, 2.0);
        r.revenue.insert("Incassi Mar".to_string(), 5.5);
        assert_eq!(r.total_revenue(), 15.5);
        assert_eq!(r.total_attendance(), 2.0);
    }

    #[test]
    fn test_record_key_equal_for_identical_rows() {
        let a = record("Troisi", 10.0, 2.0);
        let b = record("Troisi", 10.0, 2.0);
        let c = record("Farnese", 10.0, 2.0);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_record_key_negative_zero() {
        let a = record("Troisi", 0.0, 0.0);
        let b = record("Troisi", -0.0, 0.0);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_align_fills_missing_columns() {
        let mut r = record("Troisi", 10.0, 2.0);
        let columns = ColumnSet::detect(["Incassi Lun", "Incassi Mar", "Presenze Lun"]);
        r.align_to(&columns, &["Distributore".to_string()]);
        assert_eq!(r.revenue.get("Incassi Mar"), Some(&0.0));
        assert_eq!(r.extra.get("Distributore").map(String::as_str), Some(""));
        assert_eq!(r.revenue.get("Incassi Lun"), Some(&10.0));
    }

    #[test]
    fn test_venue_detail_rows_total_last() {
        let detail = VenueDetail {
            venue: "Troisi".to_string(),
            city: "Roma".to_string(),
            movies: vec![
                AggregateRow::from_totals("A", 100.0, 10.0),
                AggregateRow::from_totals("B", 50.0, 5.0),
            ],
            total: AggregateRow::from_totals("Total", 150.0, 15.0),
        };
        let labels: Vec<&str> = detail.rows().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "Total"]);
    }

    #[test]
    fn test_sheet_layout_default() {
        let layout = SheetLayout::default();
        assert_eq!(layout.header_row, 1);
        assert_eq!(layout.leading_rows, 2);
        assert_eq!(layout.trailing_rows, 2);
    }
}
