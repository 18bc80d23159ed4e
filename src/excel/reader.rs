//! Excel reader implementation - Excel (.xlsx) sheet → records

use super::address::column_letter;
use super::workbook::{cell_from_data, open_xlsx, same_name};
use crate::error::{SheetsmithError, SheetsmithResult};
use crate::types::{CellValue, ReadOptions, Record, SheetSelector};
use calamine::{Data, Range, Reader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Reads one sheet of an .xlsx file into header-keyed records
pub struct ExcelReader {
    path: PathBuf,
    options: ReadOptions,
}

impl ExcelReader {
    /// Create a new reader with default options
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: ReadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the sheets of the workbook in file order
    pub fn sheet_names(&self) -> SheetsmithResult<Vec<String>> {
        let workbook = open_xlsx(&self.path).inspect_err(|err| self.log_error(err))?;
        Ok(workbook.sheet_names())
    }

    /// Read the selected sheet into records
    ///
    /// Every record carries the same keys, in header order. Blank cells are
    /// kept as [`CellValue::Empty`].
    pub fn read(&self, selector: &SheetSelector) -> SheetsmithResult<Vec<Record>> {
        info!(path = %self.path.display(), sheet = %selector, "opening workbook for read");

        let records = self
            .read_sheet(selector)
            .inspect_err(|err| self.log_error(err))?;

        info!(
            path = %self.path.display(),
            sheet = %selector,
            rows = records.len(),
            "read complete"
        );
        Ok(records)
    }

    fn read_sheet(&self, selector: &SheetSelector) -> SheetsmithResult<Vec<Record>> {
        let range = {
            // File handle lives only for this block
            let mut workbook = open_xlsx(&self.path)?;
            let names = workbook.sheet_names();
            let name = match selector {
                SheetSelector::Name(wanted) => names.iter().find(|n| same_name(n, wanted)),
                SheetSelector::Index(index) => names.get(*index),
            }
            .cloned()
            .ok_or_else(|| SheetsmithError::sheet_not_found(selector, &names))?;

            workbook
                .worksheet_range(&name)
                .map_err(|e| SheetsmithError::UnsupportedFormat {
                    path: self.path.clone(),
                    reason: format!("failed to read sheet '{}': {}", name, e),
                })?
        };

        records_from_range(&range, &self.options)
    }

    fn log_error(&self, err: &SheetsmithError) {
        error!(
            path = %self.path.display(),
            code = err.code(),
            error = %err,
            "read failed"
        );
    }
}

/// Read `selector` from `path` in one call
pub fn read<P: AsRef<Path>>(
    path: P,
    selector: &SheetSelector,
    options: ReadOptions,
) -> SheetsmithResult<Vec<Record>> {
    ExcelReader::new(path).with_options(options).read(selector)
}

/// Build records from a calamine range
///
/// The range starts at the first used row, so leading blank rows are
/// skipped and `header_row` counts from there.
pub(crate) fn records_from_range(
    range: &Range<Data>,
    options: &ReadOptions,
) -> SheetsmithResult<Vec<Record>> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        debug!("sheet is empty");
        check_required(&[], options)?;
        return Ok(Vec::new());
    };

    let header_row = start.0.saturating_add(options.header_row);
    if header_row > end.0 {
        warn!(
            header_row,
            last_row = end.0,
            "header row lies below the used range"
        );
        check_required(&[], options)?;
        return Ok(Vec::new());
    }

    let columns = header_columns(range, header_row, start.1, end.1)?;
    let keys: Vec<String> = columns.iter().map(|(_, key)| key.clone()).collect();
    check_required(&keys, options)?;

    let mut records = Vec::new();
    for row in (header_row + 1)..=end.0 {
        let values: Vec<CellValue> = columns
            .iter()
            .map(|(col, _)| {
                range
                    .get_value((row, *col))
                    .map(cell_from_data)
                    .unwrap_or(CellValue::Empty)
            })
            .collect();

        if options.skip_empty_rows && values.iter().all(CellValue::is_empty) {
            continue;
        }

        records.push(keys.iter().cloned().zip(values).collect());
    }

    Ok(records)
}

/// Resolve header keys for columns `first_col..=last_col`
///
/// Names are trimmed; two equal non-empty names are an error. Blank header
/// cells get a synthetic `column_<LETTER>` key.
fn header_columns(
    range: &Range<Data>,
    header_row: u32,
    first_col: u32,
    last_col: u32,
) -> SheetsmithResult<Vec<(u32, String)>> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut columns: Vec<(u32, Option<String>)> = Vec::new();

    for col in first_col..=last_col {
        let name = range
            .get_value((header_row, col))
            .map(cell_from_data)
            .map(|value| value.to_string().trim().to_string())
            .filter(|name| !name.is_empty());

        if let Some(name) = &name {
            if let Some(first) = seen.insert(name.clone(), col) {
                return Err(SheetsmithError::DuplicateHeader {
                    name: name.clone(),
                    first: letter(first),
                    second: letter(col),
                });
            }
        }
        columns.push((col, name));
    }

    Ok(columns
        .into_iter()
        .map(|(col, name)| {
            let key = name.unwrap_or_else(|| {
                let mut key = format!("column_{}", letter(col));
                while seen.contains_key(&key) {
                    key.push('_');
                }
                seen.insert(key.clone(), col);
                key
            });
            (col, key)
        })
        .collect())
}

fn letter(col: u32) -> String {
    column_letter(col.min(u16::MAX as u32) as u16)
}

fn check_required(keys: &[String], options: &ReadOptions) -> SheetsmithResult<()> {
    let missing: Vec<String> = options
        .required_columns
        .iter()
        .filter(|required| !keys.iter().any(|k| k == *required))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SheetsmithError::MissingColumns {
            missing,
            available: keys.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_from(rows: &[&[Data]]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), value.clone());
            }
        }
        range
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    #[test]
    fn test_records_from_range_basic() {
        let range = range_from(&[
            &[s("Name"), s("Age")],
            &[s("Alice"), Data::Float(30.0)],
            &[s("Bob"), Data::Int(25)],
        ]);

        let records = records_from_range(&range, &ReadOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new().with("Name", "Alice").with("Age", 30));
        assert_eq!(records[1], Record::new().with("Name", "Bob").with("Age", 25));
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let range = range_from(&[&[s("  Name "), s("Age\t")], &[s("Alice"), Data::Int(1)]]);
        let records = records_from_range(&range, &ReadOptions::default()).unwrap();
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["Name", "Age"]);
    }

    #[test]
    fn test_duplicate_header_after_trim() {
        let range = range_from(&[&[s("Name"), s("Age"), s(" Name")], &[s("a"), s("b"), s("c")]]);
        let err = records_from_range(&range, &ReadOptions::default()).unwrap_err();
        match err {
            SheetsmithError::DuplicateHeader {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "Name");
                assert_eq!(first, "A");
                assert_eq!(second, "C");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_blank_headers_get_synthetic_keys() {
        let range = range_from(&[
            &[s("Name"), Data::Empty, Data::Empty],
            &[s("a"), s("b"), Data::Empty],
        ]);
        let records = records_from_range(&range, &ReadOptions::default()).unwrap();
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["Name", "column_B", "column_C"]);
        assert_eq!(records[0].get("column_C"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_empty_rows_skipped_or_kept() {
        let range = range_from(&[
            &[s("Name")],
            &[s("Alice")],
            &[Data::Empty],
            &[s("Bob")],
        ]);

        let skipped = records_from_range(&range, &ReadOptions::default()).unwrap();
        assert_eq!(skipped.len(), 2);

        let kept =
            records_from_range(&range, &ReadOptions::default().skip_empty_rows(false)).unwrap();
        assert_eq!(kept.len(), 3);
        assert!(kept[1].is_blank());
        assert_eq!(kept[1].len(), 1);
    }

    #[test]
    fn test_header_row_offset() {
        let range = range_from(&[
            &[s("Quarterly report"), Data::Empty],
            &[s("Name"), s("Score")],
            &[s("Alice"), Data::Float(9.5)],
        ]);
        let records =
            records_from_range(&range, &ReadOptions::default().header_row(1)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Score"), Some(&CellValue::Number(9.5)));
    }

    #[test]
    fn test_missing_required_columns() {
        let range = range_from(&[&[s("Name")], &[s("Alice")]]);
        let options = ReadOptions::default().require(["Name", "Phone"]);
        match records_from_range(&range, &options).unwrap_err() {
            SheetsmithError::MissingColumns { missing, available } => {
                assert_eq!(missing, vec!["Phone".to_string()]);
                assert_eq!(available, vec!["Name".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_mixed_type_column_keeps_native_types() {
        let range = range_from(&[
            &[s("Value")],
            &[Data::Float(1.0)],
            &[s("n/a")],
            &[Data::Bool(true)],
        ]);
        let records = records_from_range(&range, &ReadOptions::default()).unwrap();
        let values: Vec<&CellValue> = records.iter().filter_map(|r| r.get("Value")).collect();
        assert_eq!(
            values,
            vec![
                &CellValue::Number(1.0),
                &CellValue::from("n/a"),
                &CellValue::Bool(true)
            ]
        );
    }
}
