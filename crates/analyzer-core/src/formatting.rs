use std::sync::OnceLock;

use regex::Regex;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use analyzer_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a fraction of an ULP so exact midpoints round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // "0.50" → ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an amount in euro with two decimals and thousands separators.
///
/// ```
/// use analyzer_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "€1,234.56");
/// assert_eq!(format_currency(-9.99),   "€-9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("€-{}", format_number(amount.abs(), 2))
    } else {
        format!("€{}", format_number(amount, 2))
    }
}

/// Capitalise the first letter of every alphabetic run and lowercase the rest.
///
/// Any non-letter (space, apostrophe, digit, hyphen) starts a new word, so
/// `"l'ultimo BACIO"` becomes `"L'Ultimo Bacio"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Parse a cell holding a money amount or a head count.
///
/// Empty cells count as zero. Currency symbols and spaces are ignored. When
/// both `.` and `,` appear, the last one is the decimal mark (`1.234,50`,
/// `1,234.50`); a separator repeated in groups of three is a thousands
/// separator (`1.234.567`). A lone comma is the Italian decimal mark.
///
/// A lone dot followed by exactly three digits (`1.234`) reads as both a
/// decimal and an Italian thousands group, so it is rejected. Returns `None`
/// for that case and for text that is not a finite number.
pub fn parse_amount(text: &str) -> Option<f64> {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    let noise = NOISE.get_or_init(|| Regex::new(r"[€$\s\u{a0}]").expect("valid regex"));

    let cleaned = noise.replace_all(text.trim(), "");
    if cleaned.is_empty() {
        return Some(0.0);
    }

    let plain = normalize_separators(&cleaned)?;
    plain.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Rewrite `text` with `.` as the only (decimal) separator.
fn normalize_separators(text: &str) -> Option<String> {
    match (text.rfind('.'), text.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (thousands, at) = if dot > comma { (',', dot) } else { ('.', comma) };
            let (integer, fraction) = (&text[..at], &text[at + 1..]);
            if !fraction.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(format!("{}.{}", ungroup(integer, thousands)?, fraction))
        }
        (None, Some(_)) if text.matches(',').count() == 1 => Some(text.replace(',', ".")),
        (None, Some(_)) => ungroup(text, ','),
        (Some(_), None) if text.matches('.').count() > 1 => ungroup(text, '.'),
        (Some(dot), None) => {
            let (integer, fraction) = (&text[..dot], &text[dot + 1..]);
            let digits = integer.trim_start_matches(['-', '+']);
            let ambiguous = fraction.len() == 3
                && fraction.chars().all(|c| c.is_ascii_digit())
                && (1..=3).contains(&digits.len())
                && !digits.starts_with('0');
            if ambiguous {
                None
            } else {
                Some(text.to_string())
            }
        }
        (None, None) => Some(text.to_string()),
    }
}

/// Drop `sep` from a number written in groups of three digits; `None` when
/// the grouping is irregular.
fn ungroup(text: &str, sep: char) -> Option<String> {
    let mut groups = text.split(sep);
    let head = groups.next()?;
    let head_digits = head.trim_start_matches(['-', '+']);
    if head_digits.is_empty() || head_digits.len() > 3 {
        return None;
    }
    let mut out = head.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero() {
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    // ── format_currency ──────────────────────────────────────────────────────

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "€0.00");
        assert_eq!(format_currency(1_000_000.0), "€1,000,000.00");
    }

    // ── title_case ───────────────────────────────────────────────────────────

    #[test]
    fn test_title_case_upper_input() {
        assert_eq!(title_case("CINEMA MODERNISSIMO"), "Cinema Modernissimo");
    }

    #[test]
    fn test_title_case_lower_input() {
        assert_eq!(title_case("quattro fontane"), "Quattro Fontane");
    }

    #[test]
    fn test_title_case_apostrophe_and_digits() {
        assert_eq!(title_case("l'ultimo BACIO"), "L'Ultimo Bacio");
        assert_eq!(title_case("2001: odissea nello spazio"), "2001: Odissea Nello Spazio");
        assert_eq!(title_case("3d"), "3D");
    }

    #[test]
    fn test_title_case_accented() {
        assert_eq!(title_case("CITTÀ APERTA"), "Città Aperta");
    }

    #[test]
    fn test_title_case_empty() {
        assert_eq!(title_case(""), "");
    }

    // ── parse_amount ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_amount_plain() {
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("  40 "), Some(40.0));
    }

    #[test]
    fn test_parse_amount_empty_is_zero() {
        assert_eq!(parse_amount(""), Some(0.0));
        assert_eq!(parse_amount("   "), Some(0.0));
    }

    #[test]
    fn test_parse_amount_italian_notation() {
        assert_eq!(parse_amount("1.234,50"), Some(1234.5));
        assert_eq!(parse_amount("€ 12,00"), Some(12.0));
    }

    #[test]
    fn test_parse_amount_last_separator_is_decimal() {
        assert_eq!(parse_amount("1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("1.234.567,8"), Some(1_234_567.8));
        assert_eq!(parse_amount("-1.234,5"), Some(-1234.5));
    }

    #[test]
    fn test_parse_amount_thousands_groups() {
        assert_eq!(parse_amount("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_amount("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_amount("1.23.4"), None);
        assert_eq!(parse_amount("12,34,5"), None);
    }

    #[test]
    fn test_parse_amount_rejects_lone_dot_thousands() {
        assert_eq!(parse_amount("1.234"), None);
        assert_eq!(parse_amount("€ 12.500"), None);
        // Not a thousands group: leading zero, or too many leading digits.
        assert_eq!(parse_amount("0.125"), Some(0.125));
        assert_eq!(parse_amount("1234.567"), Some(1234.567));
        assert_eq!(parse_amount("12.50"), Some(12.5));
    }

    #[test]
    fn test_parse_amount_rejects_text() {
        assert_eq!(parse_amount("sold out"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
