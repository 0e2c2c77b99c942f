//! Static configuration: which cities and venues take part in an analysis,
//! and how the raw exports are shaped.
//!
//! The registry is never derived from the data; venues seen in the exports
//! but absent here are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};
use crate::models::{ColumnNames, SheetLayout};

/// City whose per-venue aggregate gets a table of its own.
pub const HOME_CITY: &str = "Roma";

/// Venue representing [`HOME_CITY`] in the cross-city comparison.
pub const HOME_REPRESENTATIVE: &str = "Troisi";

// ── Registry ──────────────────────────────────────────────────────────────────

/// A city and the venues recognised in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityEntry {
    pub city: String,
    pub venues: Vec<String>,
}

/// Ordered mapping City → recognised venue names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: Vec<CityEntry>,
}

impl Registry {
    pub fn new(entries: Vec<CityEntry>) -> Self {
        Self { entries }
    }

    /// Build a registry from `(city, venues)` literals.
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(city, venues)| CityEntry {
                    city: city.to_string(),
                    venues: venues.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[CityEntry] {
        &self.entries
    }

    /// City names in registry order.
    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.city.as_str())
    }

    pub fn contains_city(&self, city: &str) -> bool {
        self.entries.iter().any(|e| e.city == city)
    }

    /// Every recognised venue, in registry order, without repeats.
    pub fn venue_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for venue in self.entries.iter().flat_map(|e| e.venues.iter()) {
            if !names.contains(&venue.as_str()) {
                names.push(venue);
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    /// The venue chain the analyzer was built for.
    fn default() -> Self {
        Self::from_pairs(&[
            (
                "Roma",
                &[
                    "Troisi",
                    "Barberini",
                    "Quattro Fontane",
                    "Farnese",
                    "Intrastevere",
                    "Nuovo Sacher",
                    "Greenwich",
                ],
            ),
            ("Milano", &["Beltrade"]),
            ("Bologna", &["Cinema Modernissimo"]),
            ("Trento", &["Roma"]),
        ])
    }
}

// ── AnalyzerConfig ────────────────────────────────────────────────────────────

/// Everything an analysis needs besides the raw files.
///
/// Loaded from a JSON document; every field is optional and falls back to
/// the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub registry: Registry,
    pub columns: ColumnNames,
    pub layout: SheetLayout,
}

impl AnalyzerConfig {
    /// Load the config from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            cities = config.registry.entries().len(),
            "analyzer config loaded"
        );
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.is_empty() {
            return Err(AnalyzerError::Config("registry has no cities".to_string()));
        }
        if self.layout.header_row >= self.layout.leading_rows {
            return Err(AnalyzerError::Config(format!(
                "header row {} must fall inside the {} leading rows",
                self.layout.header_row, self.layout.leading_rows
            )));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
