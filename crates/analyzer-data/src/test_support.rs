//! Fixtures shared by the data-crate tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use analyzer_core::error::Result;
use analyzer_core::models::CanonicalRecord;
use analyzer_core::office::OfficeSuite;

use crate::merger::MergedDataset;

/// `(city, venue, title, revenue, attendance)`
pub type Row<'a> = (&'a str, &'a str, &'a str, f64, f64);

/// Rows of an export: one metadata row, the header, the data, two footer rows.
pub fn export_rows(rows: &[Row]) -> Vec<Vec<String>> {
    let mut out = vec![
        vec!["Report settimanale".to_string()],
        ["Città", "Cinema", "Titolo Film", "Incassi", "Presenze"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    ];
    for (city, venue, title, revenue, attendance) in rows {
        out.push(vec![
            city.to_string(),
            venue.to_string(),
            title.to_string(),
            revenue.to_string(),
            attendance.to_string(),
        ]);
    }
    out.push(vec!["Totale".to_string()]);
    out.push(vec!["Generato automaticamente".to_string()]);
    out
}

/// Write `rows` to the first sheet of a new workbook at `path`. Cells that
/// parse as numbers are stored as numbers.
pub fn write_export(path: &Path, rows: &[Vec<String>]) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_by_name_mut("Sheet1")
        .expect("default sheet");
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let cell = sheet.get_cell_mut(((c + 1) as u32, (r + 1) as u32));
            match value.parse::<f64>() {
                Ok(number) => {
                    cell.set_value_number(number);
                }
                Err(_) => {
                    cell.set_value(value.as_str());
                }
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub fn record(city: &str, venue: &str, title: &str, revenue: f64, attendance: f64) -> CanonicalRecord {
    CanonicalRecord {
        city: city.to_string(),
        venue: venue.to_string(),
        title: title.to_string(),
        revenue: BTreeMap::from([("Incassi".to_string(), revenue)]),
        attendance: BTreeMap::from([("Presenze".to_string(), attendance)]),
        extra: BTreeMap::new(),
    }
}

pub fn dataset(rows: &[Row]) -> MergedDataset {
    MergedDataset {
        records: rows
            .iter()
            .map(|(city, venue, title, revenue, attendance)| {
                record(city, venue, title, *revenue, *attendance)
            })
            .collect(),
        ..Default::default()
    }
}

/// [`OfficeSuite`] that counts calls and optionally "repairs" a file by
/// overwriting it with a known-good export.
#[derive(Default)]
pub struct FakeOffice {
    repaired_rows: Option<Vec<Vec<String>>>,
    calls: Mutex<usize>,
}

impl FakeOffice {
    pub fn repairing_with(rows: Vec<Vec<String>>) -> Self {
        Self {
            repaired_rows: Some(rows),
            calls: Mutex::new(0),
        }
    }

    pub fn resave_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl OfficeSuite for FakeOffice {
    fn resave(&self, path: &Path) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        if let Some(rows) = &self.repaired_rows {
            write_export(path, rows);
        }
        Ok(())
    }

    fn export_pdf(&self, path: &Path, out_dir: &Path) -> Result<PathBuf> {
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let pdf = out_dir.join(format!("{}.pdf", stem));
        std::fs::write(&pdf, b"%PDF-1.4\n")?;
        Ok(pdf)
    }

    fn is_available(&self) -> bool {
        true
    }
}
