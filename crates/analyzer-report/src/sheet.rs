//! Drawing a [`ReportTable`] onto a worksheet.

use umya_spreadsheet::{NumberingFormat, OrientationValues, PatternValues, Style, Worksheet};

use crate::layout::{column_letter, display_width};
use crate::tables::{CellValue, ReportTable};

/// Light blue behind printed header rows.
pub const HEADER_FILL: &str = "FFADD8E6";

const MIN_COLUMN_WIDTH: f64 = 8.0;
const MAX_COLUMN_WIDTH: f64 = 45.0;
const NUMBER_COLUMN_WIDTH: usize = 12;

// A4 in points, with the default 0.75in margins on every side.
const A4_PAPER: u32 = 9;
const PAGE_SHORT_PT: f64 = 595.0 - 2.0 * 54.0;
const PAGE_LONG_PT: f64 = 842.0 - 2.0 * 54.0;
/// Points per character of column width, Calibri 11 (7px digit, 5px padding).
const CHAR_WIDTH_PT: f64 = 5.25;
const COLUMN_PADDING_PT: f64 = 3.75;
const LINE_HEIGHT_FACTOR: f64 = 1.3;
const EMPTY_ROW_PT: f64 = 15.0;
const MIN_SCALE: u32 = 10;

/// How a table is dressed on its sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetStyle {
    /// Put the table title above the header.
    pub title_row: bool,
    /// Font size of every cell; the title is two points larger.
    pub font_size: Option<f64>,
    /// ARGB fill behind the header cells.
    pub header_fill: Option<&'static str>,
    /// Scale the printout so the whole table lands on one page.
    pub fit_page: bool,
}

/// Write `table` at the top-left of `sheet`. Returns the number of rows used.
pub fn write_table(sheet: &mut Worksheet, table: &ReportTable, style: &SheetStyle) -> u32 {
    let mut row: u32 = 1;

    if style.title_row {
        let cell = sheet.get_cell_mut((1, row));
        cell.set_value(table.title.as_str());
        let font = cell.get_style_mut().get_font_mut();
        font.set_bold(true);
        if let Some(size) = style.font_size {
            font.set_size(size + 2.0);
        }
        // Blank spacer row below the title.
        row += 2;
    }

    for (i, name) in table.header.iter().enumerate() {
        let cell = sheet.get_cell_mut((i as u32 + 1, row));
        cell.set_value(name.as_str());
        let cell_style = cell.get_style_mut();
        apply_font(cell_style, style.font_size, true);
        if let Some(argb) = style.header_fill {
            let pattern = cell_style.get_fill_mut().get_pattern_fill_mut();
            pattern.set_pattern_type(PatternValues::Solid);
            pattern.get_foreground_color_mut().set_argb(argb);
        }
    }

    let total_row = table.total_row();
    for (r, cells) in table.rows.iter().enumerate() {
        row += 1;
        let bold = total_row == Some(r);
        for (c, value) in cells.iter().enumerate() {
            let cell = sheet.get_cell_mut((c as u32 + 1, row));
            match value {
                CellValue::Text(text) => {
                    cell.set_value(text.as_str());
                    if text.contains('\n') {
                        cell.get_style_mut().get_alignment_mut().set_wrap_text(true);
                    }
                }
                CellValue::Amount(amount) => {
                    cell.set_value_number(*amount);
                    cell.get_style_mut()
                        .get_number_format_mut()
                        .set_format_code(NumberingFormat::FORMAT_NUMBER_COMMA_SEPARATED1);
                }
                CellValue::Count(count) => {
                    cell.set_value_number(*count);
                    cell.get_style_mut()
                        .get_number_format_mut()
                        .set_format_code(NumberingFormat::FORMAT_NUMBER);
                }
            }
            apply_font(cell.get_style_mut(), style.font_size, bold);
        }
    }

    let widths = column_widths(table);
    for (c, width) in widths.iter().enumerate() {
        sheet
            .get_column_dimension_mut(&column_letter(c as u32 + 1))
            .set_width(*width);
    }

    if style.fit_page {
        let (width, height) = printed_size(table, style, &widths);
        let fit = page_fit(width, height);
        let orientation = if fit.landscape {
            OrientationValues::Landscape
        } else {
            OrientationValues::Portrait
        };
        sheet
            .get_page_setup_mut()
            .set_paper_size(A4_PAPER)
            .set_orientation(orientation)
            .set_scale(fit.scale)
            .set_fit_to_width(1)
            .set_fit_to_height(1);
    }

    row
}

/// Estimated printed extent of the table at 100%, in points.
fn printed_size(table: &ReportTable, style: &SheetStyle, widths: &[f64]) -> (f64, f64) {
    let font = style.font_size.unwrap_or(11.0);
    let line = font * LINE_HEIGHT_FACTOR;

    let width: f64 = widths
        .iter()
        .map(|w| w * CHAR_WIDTH_PT + COLUMN_PADDING_PT)
        .sum();

    let mut height = line;
    if style.title_row {
        height += (font + 2.0) * LINE_HEIGHT_FACTOR + EMPTY_ROW_PT;
    }
    for cells in &table.rows {
        let lines = cells
            .iter()
            .map(|value| match value {
                CellValue::Text(text) => text.lines().count().max(1),
                _ => 1,
            })
            .max()
            .unwrap_or(1);
        height += lines as f64 * line;
    }
    (width, height)
}

/// How a table is printed on its single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFit {
    pub landscape: bool,
    /// Percentage, 10 to 100.
    pub scale: u32,
}

/// Orientation and scale that fit `width` x `height` points on one A4 page,
/// never enlarging.
pub fn page_fit(width: f64, height: f64) -> PageFit {
    let scale = |page_w: f64, page_h: f64| {
        let ratio = (page_w / width.max(1.0)).min(page_h / height.max(1.0));
        ((ratio * 100.0).floor() as u32).clamp(MIN_SCALE, 100)
    };
    let portrait = scale(PAGE_SHORT_PT, PAGE_LONG_PT);
    let landscape = scale(PAGE_LONG_PT, PAGE_SHORT_PT);
    if landscape > portrait {
        PageFit {
            landscape: true,
            scale: landscape,
        }
    } else {
        PageFit {
            landscape: false,
            scale: portrait,
        }
    }
}

fn apply_font(style: &mut Style, size: Option<f64>, bold: bool) {
    let font = style.get_font_mut();
    if bold {
        font.set_bold(true);
    }
    if let Some(size) = size {
        font.set_size(size);
    }
}

/// Character width of each column: widest header or cell line, padded.
pub fn column_widths(table: &ReportTable) -> Vec<f64> {
    let mut widths: Vec<usize> = table.header.iter().map(|h| display_width(h)).collect();
    for cells in &table.rows {
        for (c, value) in cells.iter().enumerate() {
            let width = match value {
                CellValue::Text(text) => display_width(text),
                CellValue::Amount(_) | CellValue::Count(_) => NUMBER_COLUMN_WIDTH,
            };
            if c >= widths.len() {
                widths.resize(c + 1, 0);
            }
            widths[c] = widths[c].max(width);
        }
    }
    widths
        .into_iter()
        .map(|w| (w as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
