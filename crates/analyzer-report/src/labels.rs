/// Every piece of text the renderers put around the numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    // ── Column headers ───────────────────────────────────────────────────────
    pub city: &'static str,
    pub venue: &'static str,
    pub total_revenue: &'static str,
    pub total_attendance: &'static str,
    pub average_price: &'static str,
    pub movie: &'static str,
    pub revenue: &'static str,
    pub attendance: &'static str,

    // ── Rows and sheets ──────────────────────────────────────────────────────
    /// Label of the closing row of a venue detail.
    pub total: &'static str,
    /// Name of the comparison sheet.
    pub other_cities: &'static str,
    /// Shown instead of an average price when nobody attended.
    pub not_available: &'static str,

    // ── Page titles ──────────────────────────────────────────────────────────
    /// Title of the home-city page.
    pub home_title: &'static str,
    /// Title of the comparison page.
    pub comparison_title: &'static str,
    /// Suffix of venue page titles, `"<venue> (<city>) - <suffix>"`.
    pub weekly_revenue: &'static str,

    // ── Notices ──────────────────────────────────────────────────────────────
    pub empty_input_notice: &'static str,
    pub failure_notice: &'static str,
    pub busy_notice: &'static str,
    pub cancelled_notice: &'static str,
}

impl Labels {
    pub fn english() -> Self {
        Self {
            city: "City",
            venue: "Venue",
            total_revenue: "Total revenue",
            total_attendance: "Total attendance",
            average_price: "Average price",
            movie: "Movie",
            revenue: "Revenue",
            attendance: "Attendance",
            total: "Total",
            other_cities: "Other Cities",
            not_available: "n/a",
            home_title: "Rome Competitors Total",
            comparison_title: "National Competitors Total",
            weekly_revenue: "Weekly revenue",
            empty_input_notice: "No spreadsheet files (.xlsx) found, submit the exports first.",
            failure_notice: "Something went wrong during the analysis, the workspace has been cleared.",
            busy_notice: "An analysis is already running, try again when it has finished.",
            cancelled_notice: "Analysis cancelled, the workspace has been cleared.",
        }
    }

    pub fn italian() -> Self {
        Self {
            city: "Città",
            venue: "Sala",
            total_revenue: "Incassi totali",
            total_attendance: "Presenze totali",
            average_price: "Prezzo medio",
            movie: "Film",
            revenue: "Incassi",
            attendance: "Presenze",
            total: "Totale",
            other_cities: "Altre Città",
            not_available: "n.d.",
            home_title: "Totale Competitor Roma",
            comparison_title: "Totale Competitor Nazionali",
            weekly_revenue: "Incassi settimanali",
            empty_input_notice: "Non ho trovato file excel (.xlsx), fai l'upload dei file prima.",
            failure_notice: "Qualcosa è andato storto durante l'analisi, i file sono stati eliminati.",
            busy_notice: "Un'analisi è già in corso, riprova quando sarà terminata.",
            cancelled_notice: "Analisi annullata, i file sono stati eliminati.",
        }
    }

    /// Construct labels by language code. Falls back to English for unknown
    /// codes.
    pub fn from_name(name: &str) -> Self {
        match name {
            "it" => Self::italian(),
            _ => Self::english(),
        }
    }

    /// Header of a city aggregate table.
    pub fn aggregate_header(&self) -> [&'static str; 4] {
        [
            self.venue,
            self.total_revenue,
            self.total_attendance,
            self.average_price,
        ]
    }

    /// Header of the comparison table.
    pub fn comparison_header(&self) -> [&'static str; 5] {
        [
            self.city,
            self.venue,
            self.total_revenue,
            self.total_attendance,
            self.average_price,
        ]
    }

    /// Header of a venue detail table.
    pub fn detail_header(&self) -> [&'static str; 4] {
        [self.movie, self.revenue, self.attendance, self.average_price]
    }

    /// Title of a venue page.
    pub fn venue_title(&self, venue: &str, city: &str) -> String {
        format!("{} ({}) - {}", venue, city, self.weekly_revenue)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}
