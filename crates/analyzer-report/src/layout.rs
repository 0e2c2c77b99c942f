//! Text layout helpers shared by the renderers.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Column at which movie titles are wrapped.
pub const TITLE_WIDTH: usize = 40;

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME: usize = 31;

// ── Title wrapping ────────────────────────────────────────────────────────────

/// Greedy word wrap at `width` display columns, lines joined with `\n`.
///
/// Words wider than a line are split.
///
/// ```
/// use analyzer_report::layout::wrap_title;
///
/// assert_eq!(wrap_title("Il Buono Il Brutto Il Cattivo", 12), "Il Buono Il\nBrutto Il\nCattivo");
/// assert_eq!(wrap_title("Nomadland", 40), "Nomadland");
/// ```
pub fn wrap_title(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);

        if current_width > 0 && current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
            continue;
        }
        if current_width > 0 {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }
        for c in word.chars() {
            let char_width = c.width().unwrap_or(0);
            if current_width > 0 && current_width + char_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += char_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Display width of the widest line of `text`.
pub fn display_width(text: &str) -> usize {
    text.lines()
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
}

// ── Sheet names ───────────────────────────────────────────────────────────────

/// Make `name` acceptable as an Excel sheet name: forbidden characters
/// (`[]:*?/\`) removed, no leading or trailing apostrophe, at most
/// [`MAX_SHEET_NAME`] characters, never empty.
pub fn sanitize_sheet_name(name: &str) -> String {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    let forbidden = FORBIDDEN.get_or_init(|| Regex::new(r"[\[\]:*?/\\]").expect("valid regex"));

    let cleaned = forbidden.replace_all(name, "");
    let trimmed = cleaned.trim().trim_matches('\'').trim();
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME).collect();
    let truncated = truncated.trim_end().to_string();
    if truncated.is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

/// Hands out sanitized sheet names, never the same one twice.
///
/// Excel compares sheet names case-insensitively, so does this.
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a name for `preferred`; on collision try `fallback`, then
    /// numbered variants `"<name> (2)"`, `"<name> (3)"`…
    pub fn assign(&mut self, preferred: &str, fallback: Option<&str>) -> String {
        let first = sanitize_sheet_name(preferred);
        if self.try_take(&first) {
            return first;
        }
        if let Some(fallback) = fallback {
            let second = sanitize_sheet_name(fallback);
            if self.try_take(&second) {
                return second;
            }
        }
        for n in 2.. {
            let suffix = format!(" ({})", n);
            let room = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            let stem: String = first.chars().take(room).collect();
            let candidate = format!("{}{}", stem.trim_end(), suffix);
            if self.try_take(&candidate) {
                return candidate;
            }
        }
        unreachable!("sheet name counter exhausted")
    }

    fn try_take(&mut self, name: &str) -> bool {
        self.used.insert(name.to_lowercase())
    }
}

// ── Column letters ────────────────────────────────────────────────────────────

/// Spreadsheet column letters for a 1-based column index (`1` → `A`,
/// `27` → `AA`).
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_title_short_unchanged() {
        assert_eq!(wrap_title("La Dolce Vita", TITLE_WIDTH), "La Dolce Vita");
    }

    #[test]
    fn test_wrap_title_at_forty_columns() {
        let title = "Il Signore Degli Anelli La Compagnia Dell'Anello Versione Estesa";
        let wrapped = wrap_title(title, TITLE_WIDTH);
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|l| UnicodeWidthStr::width(l) <= TITLE_WIDTH));
        assert_eq!(wrapped.replace('\n', " "), title);
    }

    #[test]
    fn test_wrap_title_splits_long_words() {
        assert_eq!(wrap_title("abcdefghij", 4), "abcd\nefgh\nij");
    }

    #[test]
    fn test_wrap_title_collapses_whitespace() {
        assert_eq!(wrap_title("  Roma   Città  Aperta ", 40), "Roma Città Aperta");
        assert_eq!(wrap_title("", 40), "");
    }

    #[test]
    fn test_wrap_title_wide_characters() {
        // Each CJK character is two columns wide.
        assert_eq!(wrap_title("千と千尋", 4), "千と\n千尋");
    }

    #[test]
    fn test_display_width() {
        assert_eq!(display_width("abc\nabcdef"), 6);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Cinema: Roma/Trento?"), "Cinema RomaTrento");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("[]"), "Sheet");
        let long = "A".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn test_sheet_namer_uses_fallback_then_numbers() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("Roma", None), "Roma");
        assert_eq!(namer.assign("Roma", Some("Roma (Trento)")), "Roma (Trento)");
        assert_eq!(namer.assign("roma", Some("Roma (Trento)")), "roma (2)");
        assert_eq!(namer.assign("Roma", None), "Roma (3)");
    }

    #[test]
    fn test_sheet_namer_numbered_names_fit() {
        let mut namer = SheetNamer::new();
        let long = "B".repeat(40);
        namer.assign(&long, None);
        let second = namer.assign(&long, None);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(5), "E");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
    }
}
