//! Excel writer implementation - records → Excel (.xlsx)

use super::address::{MAX_COLUMN, MAX_ROW};
use super::formatter::SheetFormatter;
use super::rules::FormattingRule;
use super::workbook::{validate_sheet_name, Sheet, Workbook};
use crate::error::{SheetsmithError, SheetsmithResult};
use crate::types::{CellValue, Rows, WriteOptions, WriteResult};
use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Writes rows into a sheet of an .xlsx file
///
/// Work happens on an in-memory [`Workbook`]; the file on disk is replaced
/// only after every sheet was written and formatted, so a failed write
/// leaves any existing file untouched.
#[derive(Debug, Clone, Default)]
pub struct ExcelWriter {
    rules: Vec<FormattingRule>,
    temp_dir: Option<PathBuf>,
}

/// Rows normalised to a header plus positional values
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl ExcelWriter {
    /// Create a writer that applies no formatting
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatting rules applied to every written sheet before saving
    pub fn with_rules(mut self, rules: Vec<FormattingRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Stage the temporary output file in `dir` (same filesystem as targets)
    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Write `rows` to `sheet_name` in the workbook at `path`
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        sheet_name: &str,
        rows: &Rows,
        options: WriteOptions,
    ) -> SheetsmithResult<WriteResult> {
        let mut results = self.write_sheets(path, &[(sheet_name, rows)], options)?;
        Ok(results.remove(0))
    }

    /// Write several sheets into one workbook with a single save
    pub fn write_sheets<P: AsRef<Path>>(
        &self,
        path: P,
        sheets: &[(&str, &Rows)],
        options: WriteOptions,
    ) -> SheetsmithResult<Vec<WriteResult>> {
        let path = path.as_ref();
        self.write_inner(path, sheets, options).inspect_err(|err| {
            error!(
                path = %path.display(),
                code = err.code(),
                error = %err,
                "write failed"
            );
        })
    }

    fn write_inner(
        &self,
        path: &Path,
        sheets: &[(&str, &Rows)],
        options: WriteOptions,
    ) -> SheetsmithResult<Vec<WriteResult>> {
        // Validate everything before touching the filesystem
        let mut tables = Vec::with_capacity(sheets.len());
        for (name, rows) in sheets {
            validate_sheet_name(name)?;
            tables.push(normalise(rows)?);
        }

        if path.is_dir() {
            return Err(SheetsmithError::PathUnwritable {
                path: path.to_path_buf(),
                reason: "target is a directory".to_string(),
            });
        }

        let mut workbook = if path.exists() {
            Workbook::open(path)?
        } else {
            debug!(path = %path.display(), "creating new workbook");
            Workbook::new()
        };

        let mut results = Vec::with_capacity(sheets.len());
        for ((name, _), table) in sheets.iter().zip(&tables) {
            let rows_written = stage(&mut workbook, name, table, options)?;

            if !self.rules.is_empty() {
                SheetFormatter::new(self.rules.clone()).format(&mut workbook, name)?;
            }

            results.push(WriteResult {
                sheet_name: name.to_string(),
                rows_written,
            });
        }

        workbook.save_via(path, self.temp_dir.as_deref())?;

        for result in &results {
            info!(
                path = %path.display(),
                sheet = %result.sheet_name,
                rows = result.rows_written,
                "write complete"
            );
        }
        Ok(results)
    }
}

/// Write `rows` to `sheet_name` at `path` in one call, without formatting
pub fn write<P: AsRef<Path>>(
    path: P,
    sheet_name: &str,
    rows: &Rows,
    options: WriteOptions,
) -> SheetsmithResult<WriteResult> {
    ExcelWriter::new().write(path, sheet_name, rows, options)
}

/// Place one table into the workbook according to `options`
fn stage(
    workbook: &mut Workbook,
    name: &str,
    table: &Table,
    options: WriteOptions,
) -> SheetsmithResult<usize> {
    if let Some(sheet) = workbook.sheet_mut(name) {
        if options.append && sheet.used_range().is_some() {
            debug!(sheet = %name, "appending to existing sheet");
            return append_table(sheet, table);
        }
        if !options.append && !options.overwrite {
            return Err(SheetsmithError::SheetExists(name.to_string()));
        }
        debug!(sheet = %name, "replacing existing sheet");
        sheet.clear();
        return Ok(write_table(sheet, table));
    }

    let sheet = workbook.add_sheet(name)?;
    Ok(write_table(sheet, table))
}

/// Header at row 0, values below, columns from A
fn write_table(sheet: &mut Sheet, table: &Table) -> usize {
    for (col, header) in table.headers.iter().enumerate() {
        sheet.set_cell(0, col as u16, CellValue::String(header.clone()));
    }
    for (r, values) in table.rows.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            sheet.set_cell(r as u32 + 1, col as u16, value.clone());
        }
    }
    table.rows.len()
}

/// Add rows under the last populated row, matching columns by header name
///
/// Names are compared trimmed, as [`Sheet::header`] reports them. Unknown
/// headers become new columns to the right of the existing header.
fn append_table(sheet: &mut Sheet, table: &Table) -> SheetsmithResult<usize> {
    let Some(used) = sheet.used_range() else {
        return Ok(write_table(sheet, table));
    };

    let existing = sheet.header();
    let mut added: Vec<&str> = Vec::new();
    for header in &table.headers {
        let key = header.trim();
        if !existing.iter().any(|(_, name)| name == key) && !added.contains(&key) {
            added.push(key);
        }
    }
    check_limits(
        used.last_row as usize + 1 + table.rows.len(),
        used.last_col as usize + 1 + added.len(),
    )?;

    let mut existing = existing;
    let mut next_col = used.last_col + 1;
    let mut targets = Vec::with_capacity(table.headers.len());

    for header in &table.headers {
        let key = header.trim();
        let col = match existing.iter().find(|(_, name)| name == key) {
            Some((col, _)) => *col,
            None => {
                let col = next_col;
                next_col += 1;
                sheet.set_cell(used.first_row, col, CellValue::String(header.clone()));
                existing.push((col, key.to_string()));
                col
            }
        };
        targets.push(col);
    }

    let first_row = used.last_row + 1;
    for (r, values) in table.rows.iter().enumerate() {
        for (value, col) in values.iter().zip(&targets) {
            sheet.set_cell(first_row + r as u32, *col, value.clone());
        }
    }
    Ok(table.rows.len())
}

/// Total sheet size, header row included, must fit Excel's grid
fn check_limits(rows: usize, columns: usize) -> SheetsmithResult<()> {
    if rows > MAX_ROW as usize + 1 || columns > MAX_COLUMN as usize + 1 {
        return Err(SheetsmithError::SheetLimits { rows, columns });
    }
    Ok(())
}

/// Flatten records or raw rows into a rectangular table
fn normalise(rows: &Rows) -> SheetsmithResult<Table> {
    match rows {
        Rows::Records(records) => {
            let headers: IndexSet<&str> = records.iter().flat_map(|r| r.keys()).collect();
            let rows = records
                .iter()
                .map(|record| {
                    headers
                        .iter()
                        .map(|key| record.get(key).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            check_limits(records.len() + 1, headers.len())?;
            Ok(Table {
                headers: headers.into_iter().map(str::to_string).collect(),
                rows,
            })
        }
        Rows::Raw { headers, rows } => {
            check_limits(rows.len() + 1, headers.len())?;
            for (index, row) in rows.iter().enumerate() {
                if row.len() != headers.len() {
                    return Err(SheetsmithError::RowShapeMismatch {
                        row: index,
                        expected: headers.len(),
                        found: row.len(),
                    });
                }
            }
            Ok(Table {
                headers: headers.clone(),
                rows: rows.clone(),
            })
        }
    }
}
