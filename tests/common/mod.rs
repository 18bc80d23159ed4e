//! Shared fixtures: small workbooks generated with rust_xlsxwriter

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use sheetsmith::types::CellValue;
use std::path::{Path, PathBuf};

/// Write one workbook; each sheet is a grid of values starting at A1
pub fn build_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<CellValue>>)]) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match value {
                    CellValue::Empty => {}
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).unwrap();
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    CellValue::String(s) => {
                        worksheet.write_string(r, c, s).unwrap();
                    }
                    CellValue::Date(dt) => {
                        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap();
                        let serial = (*dt - epoch).num_seconds() as f64 / 86_400.0;
                        worksheet
                            .write_number_with_format(r, c, serial, &date_format)
                            .unwrap();
                    }
                }
            }
        }
    }

    workbook.save(path).unwrap();
}

/// Grid helper: `grid(&[&["Name", "Age"], ...])` for all-text sheets
pub fn text_grid(rows: &[&[&str]]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|row| row.iter().map(|s| CellValue::from(*s)).collect())
        .collect()
}

/// The Name/Age sheet used across tests
pub fn people_grid() -> Vec<Vec<CellValue>> {
    vec![
        vec!["Name".into(), "Age".into()],
        vec!["Alice".into(), 30.into()],
        vec!["Bob".into(), 25.into()],
    ]
}

pub fn people_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("people.xlsx");
    build_xlsx(&path, &[("People", people_grid())]);
    path
}
