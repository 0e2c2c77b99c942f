//! Revenue and attendance aggregation.
//!
//! Turns resolved venue views into the immutable [`Report`] both renderers
//! consume: one table per city, the cross-city comparison and one
//! per-movie breakdown per venue.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use analyzer_core::models::{
    AggregateRow, CanonicalRecord, CityAggregate, ComparisonRow, Report, VenueDetail,
};
use analyzer_core::registry::{HOME_CITY, HOME_REPRESENTATIVE};
use tracing::{debug, warn};

use crate::resolver::{ResolvedVenues, VenueView};

/// Label of the synthetic row closing a venue detail.
pub const TOTAL_LABEL: &str = "Total";

// ── Totals ────────────────────────────────────────────────────────────────────

/// Unrounded revenue and attendance sums.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub revenue: f64,
    pub attendance: f64,
}

impl Totals {
    /// Add every revenue and attendance sub-column of `record`.
    pub fn add_record(&mut self, record: &CanonicalRecord) {
        self.revenue += record.total_revenue();
        self.attendance += record.total_attendance();
    }

    pub fn of<'r>(records: impl IntoIterator<Item = &'r CanonicalRecord>) -> Self {
        let mut totals = Self::default();
        for record in records {
            totals.add_record(record);
        }
        totals
    }

    pub fn to_row(self, label: impl Into<String>) -> AggregateRow {
        AggregateRow::from_totals(label, self.revenue, self.attendance)
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Builds [`Report`]s.
pub struct Aggregator;

impl Aggregator {
    /// Compute every table of the report.
    ///
    /// The result depends only on the resolved views, never on the order in
    /// which records were read.
    pub fn build_report(resolved: &ResolvedVenues<'_>) -> Report {
        let venue_rows: BTreeMap<&str, AggregateRow> = resolved
            .venues
            .iter()
            .map(|view| {
                (
                    view.venue.as_str(),
                    Totals::of(view.records.iter().copied()).to_row(view.venue.clone()),
                )
            })
            .collect();

        let cities: Vec<CityAggregate> = resolved
            .cities
            .iter()
            .map(|city| {
                let mut rows: Vec<AggregateRow> = city
                    .venues
                    .iter()
                    .filter_map(|venue| venue_rows.get(venue.as_str()).cloned())
                    .collect();
                sort_by_attendance(&mut rows);
                CityAggregate {
                    city: city.city.clone(),
                    rows,
                }
            })
            .collect();

        let comparison = Self::comparison(&cities);
        let venues = Self::detail_order(&cities)
            .into_iter()
            .filter_map(|name| resolved.venue(name))
            .map(Self::venue_detail)
            .collect::<Vec<_>>();

        debug!(
            cities = cities.len(),
            comparison_rows = comparison.len(),
            venues = venues.len(),
            "report built"
        );

        Report {
            home_city: HOME_CITY.to_string(),
            cities,
            comparison,
            venues,
        }
    }

    /// Rows of every non-home city, then the home representative, sorted by
    /// average price (descending, missing prices last).
    pub fn comparison(cities: &[CityAggregate]) -> Vec<ComparisonRow> {
        let mut rows: Vec<ComparisonRow> = cities
            .iter()
            .filter(|c| c.city != HOME_CITY)
            .flat_map(|c| {
                c.rows.iter().map(|row| ComparisonRow {
                    city: c.city.clone(),
                    row: row.clone(),
                })
            })
            .collect();

        if let Some(home) = cities.iter().find(|c| c.city == HOME_CITY) {
            match home.row(HOME_REPRESENTATIVE) {
                Some(row) => rows.push(ComparisonRow {
                    city: HOME_CITY.to_string(),
                    row: row.clone(),
                }),
                None => warn!(
                    venue = HOME_REPRESENTATIVE,
                    city = HOME_CITY,
                    "representative venue missing from comparison"
                ),
            }
        }

        rows.sort_by(|a, b| by_price_desc(a.row.average_price, b.row.average_price));
        rows
    }

    /// Venue names in rendering order: home-city table order, then every
    /// other city's table order, each venue once.
    pub fn detail_order(cities: &[CityAggregate]) -> Vec<&str> {
        let home = cities.iter().filter(|c| c.city == HOME_CITY);
        let others = cities.iter().filter(|c| c.city != HOME_CITY);

        let mut order: Vec<&str> = Vec::new();
        for city in home.chain(others) {
            for row in &city.rows {
                if !order.contains(&row.label.as_str()) {
                    order.push(row.label.as_str());
                }
            }
        }
        order
    }

    /// Per-movie breakdown of one venue view.
    pub fn venue_detail(view: &VenueView<'_>) -> VenueDetail {
        let mut by_title: BTreeMap<&str, Totals> = BTreeMap::new();
        let mut grand = Totals::default();
        for record in &view.records {
            by_title
                .entry(record.title.as_str())
                .or_default()
                .add_record(record);
            grand.add_record(record);
        }

        let mut movies: Vec<AggregateRow> = by_title
            .into_iter()
            .map(|(title, totals)| totals.to_row(title))
            .collect();
        sort_by_attendance(&mut movies);

        VenueDetail {
            venue: view.venue.clone(),
            city: view.city().unwrap_or_default().to_string(),
            movies,
            total: grand.to_row(TOTAL_LABEL),
        }
    }
}

// ── Sorting ───────────────────────────────────────────────────────────────────

/// Stable sort, attendance descending.
fn sort_by_attendance(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| b.attendance.total_cmp(&a.attendance));
}

/// Descending order of prices, `None` after every price.
fn by_price_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
