//! Venue resolution against the registry.
//!
//! Builds the per-venue and per-city views the aggregator works on. The
//! views borrow from the merged dataset.

use analyzer_core::models::CanonicalRecord;
use analyzer_core::registry::Registry;
use tracing::{debug, warn};

use crate::merger::MergedDataset;

// ── Disambiguation ────────────────────────────────────────────────────────────

/// Restricts the view of a venue to the rows of one city.
///
/// Needed where a venue name collides with a city name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisambiguationRule {
    pub venue: &'static str,
    pub city: &'static str,
}

impl DisambiguationRule {
    pub fn applies_to(&self, venue: &str) -> bool {
        self.venue == venue
    }

    pub fn keeps(&self, record: &CanonicalRecord) -> bool {
        record.city == self.city
    }
}

/// The venue "Roma" is the cinema in Trento, never rows of the city of Rome.
pub const TRENTO_ROMA_RULE: DisambiguationRule = DisambiguationRule {
    venue: "Roma",
    city: "Trento",
};

/// Rules applied by [`resolve`].
pub const DISAMBIGUATION_RULES: &[DisambiguationRule] = &[TRENTO_ROMA_RULE];

// ── Resolved views ────────────────────────────────────────────────────────────

/// Rows of one venue.
#[derive(Debug, Clone)]
pub struct VenueView<'a> {
    pub venue: String,
    pub records: Vec<&'a CanonicalRecord>,
}

impl VenueView<'_> {
    /// City of the first row of the view.
    pub fn city(&self) -> Option<&str> {
        self.records.first().map(|r| r.city.as_str())
    }
}

/// Registry venues found among the rows of one city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityVenues {
    pub city: String,
    /// Registry order.
    pub venues: Vec<String>,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedVenues<'a> {
    /// Registry venues occurring in the dataset, registry order.
    pub cinema_names: Vec<String>,
    /// One view per entry of `cinema_names`, same order.
    pub venues: Vec<VenueView<'a>>,
    /// Cities with at least one resolved venue, registry order.
    pub cities: Vec<CityVenues>,
}

impl<'a> ResolvedVenues<'a> {
    pub fn venue(&self, name: &str) -> Option<&VenueView<'a>> {
        self.venues.iter().find(|v| v.venue == name)
    }

    pub fn city(&self, name: &str) -> Option<&CityVenues> {
        self.cities.iter().find(|c| c.city == name)
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Match the dataset against the registry.
///
/// A venue view holds every row with that venue name, whatever the city,
/// after the [`DISAMBIGUATION_RULES`] are applied. Venues left with no rows
/// are dropped. A city lists the resolved venues whose view holds rows of
/// that city; cities listing none are dropped with a warning.
pub fn resolve<'a>(dataset: &'a MergedDataset, registry: &Registry) -> ResolvedVenues<'a> {
    let mut venues: Vec<VenueView<'a>> = Vec::new();

    for name in registry.venue_names() {
        let mut records: Vec<&CanonicalRecord> =
            dataset.records.iter().filter(|r| r.venue == name).collect();
        if records.is_empty() {
            continue;
        }
        for rule in DISAMBIGUATION_RULES.iter().filter(|rule| rule.applies_to(name)) {
            let before = records.len();
            records.retain(|r| rule.keeps(r));
            debug!(
                venue = name,
                city = rule.city,
                dropped = before - records.len(),
                "disambiguation rule applied"
            );
        }
        if records.is_empty() {
            debug!(venue = name, "venue has no rows left after disambiguation");
            continue;
        }
        venues.push(VenueView {
            venue: name.to_string(),
            records,
        });
    }

    let cinema_names: Vec<String> = venues.iter().map(|v| v.venue.clone()).collect();

    let mut cities = Vec::new();
    for city in registry.cities() {
        let city_venues: Vec<String> = venues
            .iter()
            .filter(|view| view.records.iter().any(|r| r.city == city))
            .map(|view| view.venue.clone())
            .collect();

        if city_venues.is_empty() {
            if dataset.records.iter().any(|r| r.city == city) {
                warn!(city, "no matching venue for city");
            }
            continue;
        }
        cities.push(CityVenues {
            city: city.to_string(),
            venues: city_venues,
        });
    }

    debug!(
        venues = cinema_names.len(),
        cities = cities.len(),
        "venues resolved"
    );

    ResolvedVenues {
        cinema_names,
        venues,
        cities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::dataset;

    #[test]
    fn test_cinema_names_in_registry_order() {
        let data = dataset(&[
            ("Milano", "Beltrade", "A", 10.0, 1.0),
            ("Roma", "Farnese", "A", 10.0, 1.0),
            ("Roma", "Troisi", "A", 10.0, 1.0),
            ("Roma", "Sconosciuto", "A", 10.0, 1.0),
        ]);
        let resolved = resolve(&data, &Registry::default());
        assert_eq!(resolved.cinema_names, vec!["Troisi", "Farnese", "Beltrade"]);
        let cities: Vec<&str> = resolved.cities.iter().map(|c| c.city.as_str()).collect();
        assert_eq!(cities, vec!["Roma", "Milano"]);
        assert_eq!(
            resolved.city("Roma").unwrap().venues,
            vec!["Troisi", "Farnese"]
        );
    }

    #[test]
    fn test_trento_roma_rule_filters_venue_view() {
        let data = dataset(&[
            ("Trento", "Roma", "A", 60.0, 6.0),
            ("Roma", "Roma", "A", 999.0, 99.0),
            ("Roma", "Troisi", "A", 10.0, 1.0),
        ]);
        let resolved = resolve(&data, &Registry::default());
        let view = resolved.venue("Roma").unwrap();
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.city(), Some("Trento"));
        assert_eq!(view.records[0].total_revenue(), 60.0);
        assert_eq!(resolved.city("Roma").unwrap().venues, vec!["Troisi"]);
        assert_eq!(resolved.city("Trento").unwrap().venues, vec!["Roma"]);
    }

    #[test]
    fn test_venue_dropped_when_rule_leaves_no_rows() {
        let data = dataset(&[
            ("Roma", "Roma", "A", 999.0, 99.0),
            ("Roma", "Troisi", "A", 10.0, 1.0),
        ]);
        let resolved = resolve(&data, &Registry::default());
        assert!(resolved.venue("Roma").is_none());
        assert_eq!(resolved.city("Roma").unwrap().venues, vec!["Troisi"]);
    }

    #[test]
    fn test_city_without_matching_venue_is_dropped() {
        let data = dataset(&[
            ("Bologna", "Lumiere", "A", 10.0, 1.0),
            ("Roma", "Troisi", "A", 10.0, 1.0),
        ]);
        let resolved = resolve(&data, &Registry::default());
        assert!(resolved.city("Bologna").is_none());
        assert!(resolved.city("Roma").is_some());
    }

    #[test]
    fn test_venue_view_spans_cities() {
        let data = dataset(&[
            ("Milano", "Troisi", "A", 5.0, 1.0),
            ("Roma", "Troisi", "A", 10.0, 1.0),
        ]);
        let resolved = resolve(&data, &Registry::default());
        assert_eq!(resolved.venue("Troisi").unwrap().records.len(), 2);
        assert_eq!(resolved.city("Milano").unwrap().venues, vec!["Troisi"]);
    }

    #[test]
    fn test_resolve_empty_dataset() {
        let data = MergedDataset::default();
        let resolved = resolve(&data, &Registry::default());
        assert!(resolved.cinema_names.is_empty());
        assert!(resolved.cities.is_empty());
    }
}
