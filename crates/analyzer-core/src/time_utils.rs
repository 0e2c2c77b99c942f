use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone name, with `"auto"` meaning the system timezone.
///
/// Unknown names fall back to UTC with a warning.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    let name = if tz_name == "auto" {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

// ── Report dates ──────────────────────────────────────────────────────────────

/// Calendar date of `now` as seen in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Today's date in `tz`.
pub fn today(tz: Tz) -> NaiveDate {
    local_date(Utc::now(), tz)
}

/// `DD_MM_YYYY`, the stamp embedded in artifact names.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%d_%m_%Y").to_string()
}

/// File name of an analysis artifact, e.g. `Analysis_05_03_2024.xlsx`.
pub fn artifact_file_name(date: NaiveDate, extension: &str) -> String {
    format!("Analysis_{}.{}", date_stamp(date), extension)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
