//! In-memory workbook handle
//!
//! A [`Workbook`] is loaded from disk with calamine, mutated in memory by the
//! writer and formatter, and rendered back to .xlsx with rust_xlsxwriter.
//! Saving goes through a temporary file that is renamed over the target only
//! once the whole document has been produced.

use super::address::{self, MAX_COLUMN};
use super::rules::{CellStyle, HorizontalAlign, VerticalAlign};
use crate::error::{SheetsmithError, SheetsmithResult};
use crate::types::{CellValue, SheetSelector};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Worksheet};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

static EMPTY: CellValue = CellValue::Empty;

/// Characters Excel refuses in sheet names
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

//==============================================================================
// Sheet
//==============================================================================

/// Minimal rectangle holding every non-empty cell (0-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl UsedRange {
    pub fn contains_row(&self, row: u32) -> bool {
        row >= self.first_row && row <= self.last_row
    }

    pub fn contains_col(&self, col: u16) -> bool {
        col >= self.first_col && col <= self.last_col
    }

    /// A1-style reference, e.g. "A1:C3"
    pub fn reference(&self) -> String {
        format!(
            "{}:{}",
            address::cell_name(self.first_row, self.first_col),
            address::cell_name(self.last_row, self.last_col)
        )
    }
}

/// Presentation state of a sheet, owned separately from its values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub column_widths: BTreeMap<u16, f64>,
    pub styles: BTreeMap<(u32, u16), CellStyle>,
    pub freeze_panes: Option<(u32, u16)>,
    pub autofilter: Option<UsedRange>,
}

/// Named grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    layout: SheetLayout,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            layout: SheetLayout::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at (row, col); cells never written read as empty
    pub fn cell(&self, row: u32, col: u16) -> &CellValue {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .unwrap_or(&EMPTY)
    }

    pub fn set_cell(&mut self, row: u32, col: u16, value: CellValue) {
        let (row, col) = (row as usize, col as usize);
        if value.is_empty() && self.rows.get(row).map_or(true, |r| col >= r.len()) {
            return;
        }
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Drop all values and layout, keeping the name
    pub fn clear(&mut self) {
        self.rows.clear();
        self.layout = SheetLayout::default();
    }

    pub fn used_range(&self) -> Option<UsedRange> {
        let mut range: Option<UsedRange> = None;
        for (r, cells) in self.rows.iter().enumerate() {
            for (c, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let (r, c) = (r as u32, c as u16);
                range = Some(match range {
                    None => UsedRange {
                        first_row: r,
                        first_col: c,
                        last_row: r,
                        last_col: c,
                    },
                    Some(u) => UsedRange {
                        first_row: u.first_row.min(r),
                        first_col: u.first_col.min(c),
                        last_row: u.last_row.max(r),
                        last_col: u.last_col.max(c),
                    },
                });
            }
        }
        range
    }

    /// Non-empty cells of the first used row, as (column, rendered name)
    pub fn header(&self) -> Vec<(u16, String)> {
        let Some(used) = self.used_range() else {
            return Vec::new();
        };
        (used.first_col..=used.last_col)
            .filter_map(|col| {
                let value = self.cell(used.first_row, col);
                (!value.is_empty()).then(|| (col, value.to_string().trim().to_string()))
            })
            .collect()
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut SheetLayout {
        &mut self.layout
    }

    pub(crate) fn replace_layout(&mut self, layout: SheetLayout) {
        self.layout = layout;
    }

    pub fn style_at(&self, row: u32, col: u16) -> Option<&CellStyle> {
        self.layout.styles.get(&(row, col))
    }

    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.layout.column_widths.get(&col).copied()
    }

    fn load_range(&mut self, range: &Range<Data>) {
        let Some((start_row, start_col)) = range.start() else {
            return;
        };
        for (r, row) in range.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let value = cell_from_data(data);
                if value.is_empty() {
                    continue;
                }
                let col = start_col as usize + c;
                if col > MAX_COLUMN as usize {
                    continue;
                }
                self.set_cell(start_row + r as u32, col as u16, value);
            }
        }
    }
}

//==============================================================================
// Workbook
//==============================================================================

/// Open spreadsheet document: an ordered set of uniquely named sheets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every sheet's values from an .xlsx file
    ///
    /// The underlying file handle is released before this returns, on both
    /// success and error paths.
    pub fn open<P: AsRef<Path>>(path: P) -> SheetsmithResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening workbook");

        Self::load(path).inspect_err(|err| {
            error!(path = %path.display(), code = err.code(), error = %err, "workbook load failed");
        })
    }

    fn load(path: &Path) -> SheetsmithResult<Self> {
        let mut source = open_xlsx(path)?;
        let mut workbook = Workbook::new();

        for name in source.sheet_names() {
            let range = source
                .worksheet_range(&name)
                .map_err(|e| SheetsmithError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: format!("failed to read sheet '{}': {}", name, e),
                })?;
            let sheet = workbook.add_sheet(&name)?;
            sheet.load_range(&range);
            debug!(sheet = %name, used = ?sheet.used_range(), "loaded sheet");
        }

        Ok(workbook)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Look a sheet up by name; Excel names are case-insensitive
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| same_name(&s.name, name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| same_name(&s.name, name))
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.sheet(name).is_some()
    }

    /// Resolve a selector to exactly one sheet
    pub fn select(&self, selector: &SheetSelector) -> SheetsmithResult<&Sheet> {
        let found = match selector {
            SheetSelector::Name(name) => self.sheet(name),
            SheetSelector::Index(index) => self.sheets.get(*index),
        };
        found.ok_or_else(|| SheetsmithError::sheet_not_found(selector, &self.sheet_names()))
    }

    /// Append a new, empty sheet
    pub fn add_sheet(&mut self, name: &str) -> SheetsmithResult<&mut Sheet> {
        validate_sheet_name(name)?;
        if self.contains_sheet(name) {
            return Err(SheetsmithError::SheetExists(name.to_string()));
        }
        self.sheets.push(Sheet::new(name));
        let index = self.sheets.len() - 1;
        Ok(&mut self.sheets[index])
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let index = self.sheets.iter().position(|s| same_name(&s.name, name))?;
        Some(self.sheets.remove(index))
    }

    /// Render the workbook and atomically move it to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SheetsmithResult<()> {
        self.save_via(path, None)
    }

    /// Like [`Workbook::save`], staging the temporary file in `temp_dir`
    /// instead of the target directory. Both must be on one filesystem.
    pub fn save_via<P: AsRef<Path>>(&self, path: P, temp_dir: Option<&Path>) -> SheetsmithResult<()> {
        let path = path.as_ref();
        let result = self
            .render(path)
            .and_then(|bytes| persist(path, temp_dir, &bytes));
        match &result {
            Ok(()) => info!(path = %path.display(), sheets = self.sheets.len(), "saved workbook"),
            Err(err) => error!(path = %path.display(), code = err.code(), error = %err, "save failed"),
        }
        result
    }

    fn render(&self, path: &Path) -> SheetsmithResult<Vec<u8>> {
        let render_error = |e: rust_xlsxwriter::XlsxError| SheetsmithError::PathUnwritable {
            path: path.to_path_buf(),
            reason: format!("failed to render workbook: {}", e),
        };
        let mut book = rust_xlsxwriter::Workbook::new();
        for sheet in &self.sheets {
            let worksheet = book.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|e| SheetsmithError::InvalidSheetName(format!("{}: {}", sheet.name, e)))?;
            render_sheet(worksheet, sheet).map_err(render_error)?;
        }
        book.save_to_buffer().map_err(render_error)
    }
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Excel limits: 1-31 characters, none of `[]:*?/\`, no leading/trailing quote
pub fn validate_sheet_name(name: &str) -> SheetsmithResult<()> {
    let valid = !name.trim().is_empty()
        && name.chars().count() <= 31
        && !name.contains(FORBIDDEN_SHEET_CHARS)
        && !name.starts_with('\'')
        && !name.ends_with('\'');
    if valid {
        Ok(())
    } else {
        Err(SheetsmithError::InvalidSheetName(name.to_string()))
    }
}

pub(crate) fn open_xlsx(path: &Path) -> SheetsmithResult<Xlsx<std::io::BufReader<std::fs::File>>> {
    if !path.is_file() {
        return Err(SheetsmithError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    open_workbook(path).map_err(|e: calamine::XlsxError| SheetsmithError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

//==============================================================================
// Cell conversion
//==============================================================================

/// Map a calamine cell to the closed [`CellValue`] variant set
pub(crate) fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return CellValue::Number(dt.as_f64());
            }
            match dt.as_datetime() {
                Some(value) => CellValue::Date(value),
                None => CellValue::Number(dt.as_f64()),
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Excel serial date (1900 system, valid from 1900-03-01)
pub(crate) fn excel_serial(value: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN);
    (*value - epoch).num_milliseconds() as f64 / 86_400_000.0
}

//==============================================================================
// Rendering
//==============================================================================

fn render_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), rust_xlsxwriter::XlsxError> {
    let layout = &sheet.layout;

    for (r, cells) in sheet.rows.iter().enumerate() {
        for (c, value) in cells.iter().enumerate() {
            let (row, col) = (r as u32, c as u16);
            let style = layout.styles.get(&(row, col));
            write_cell(worksheet, row, col, value, style)?;
        }
    }

    // Styled cells outside the value grid (e.g. zebra fill on blank cells)
    for (&(row, col), style) in &layout.styles {
        if sheet.cell(row, col).is_empty() && !style.is_empty() {
            worksheet.write_blank(row, col, &build_format(style, None))?;
        }
    }

    for (&col, &width) in &layout.column_widths {
        worksheet.set_column_width(col, width)?;
    }

    if let Some((row, col)) = layout.freeze_panes {
        worksheet.set_freeze_panes(row, col)?;
    }

    if let Some(range) = layout.autofilter {
        worksheet.autofilter(range.first_row, range.first_col, range.last_row, range.last_col)?;
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    style: Option<&CellStyle>,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let default_date_format = match value {
        CellValue::Date(dt) if dt.time() == NaiveTime::MIN => Some("yyyy-mm-dd"),
        CellValue::Date(_) => Some("yyyy-mm-dd hh:mm:ss"),
        _ => None,
    };

    let format = match (style, default_date_format) {
        (None, None) => None,
        (style, date_format) => Some(build_format(
            style.unwrap_or(&CellStyle::default()),
            date_format,
        )),
    };

    match (value, format) {
        (CellValue::Empty, _) => {}
        // xlsx has no empty string cell; "" is stored as a blank
        (CellValue::String(s), format) if s.is_empty() => {
            if let Some(format) = format {
                worksheet.write_blank(row, col, &format)?;
            }
        }
        (CellValue::String(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (CellValue::String(s), Some(format)) => {
            worksheet.write_string_with_format(row, col, s, &format)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (CellValue::Number(n), Some(format)) => {
            worksheet.write_number_with_format(row, col, *n, &format)?;
        }
        (CellValue::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (CellValue::Bool(b), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *b, &format)?;
        }
        (CellValue::Date(dt), Some(format)) => {
            worksheet.write_number_with_format(row, col, excel_serial(dt), &format)?;
        }
        (CellValue::Date(dt), None) => {
            worksheet.write_number(row, col, excel_serial(dt))?;
        }
    }
    Ok(())
}

/// Translate a [`CellStyle`] into a rust_xlsxwriter [`Format`]
fn build_format(style: &CellStyle, fallback_num_format: Option<&str>) -> Format {
    let mut format = Format::new();

    if let Some(name) = &style.font_name {
        format = format.set_font_name(name);
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if style.bold == Some(true) {
        format = format.set_bold();
    }
    if style.italic == Some(true) {
        format = format.set_italic();
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color.0));
    }
    if let Some(color) = style.fill_color {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(color.0));
    }
    if let Some(horizontal) = style.horizontal {
        format = format.set_align(match horizontal {
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
            HorizontalAlign::Right => FormatAlign::Right,
        });
    }
    if let Some(vertical) = style.vertical {
        format = format.set_align(match vertical {
            VerticalAlign::Top => FormatAlign::Top,
            VerticalAlign::Center => FormatAlign::VerticalCenter,
            VerticalAlign::Bottom => FormatAlign::Bottom,
        });
    }
    if style.wrap_text == Some(true) {
        format = format.set_text_wrap();
    }
    match (&style.number_format, fallback_num_format) {
        (Some(num_format), _) => format = format.set_num_format(num_format),
        (None, Some(num_format)) => format = format.set_num_format(num_format),
        (None, None) => {}
    }

    format
}

//==============================================================================
// Persistence
//==============================================================================

fn persist(path: &Path, temp_dir: Option<&Path>, bytes: &[u8]) -> SheetsmithResult<()> {
    let unwritable = |reason: String| SheetsmithError::PathUnwritable {
        path: path.to_path_buf(),
        reason,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| unwritable(e.to_string()))?;

    let staging = temp_dir.map(Path::to_path_buf).unwrap_or(parent);
    std::fs::create_dir_all(&staging).map_err(|e| unwritable(e.to_string()))?;

    // Removed on drop unless persisted
    let mut temp = tempfile::Builder::new()
        .prefix(".sheetsmith-")
        .suffix(".xlsx.tmp")
        .tempfile_in(&staging)
        .map_err(|e| unwritable(e.to_string()))?;
    temp.write_all(bytes).map_err(|e| unwritable(e.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| unwritable(e.to_string()))?;
    temp.persist(path)
        .map_err(|e| unwritable(e.error.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_range_ignores_empty_cells() {
        let mut sheet = Sheet::new("Data");
        assert_eq!(sheet.used_range(), None);

        sheet.set_cell(2, 1, CellValue::from("x"));
        sheet.set_cell(4, 3, CellValue::Number(1.0));
        sheet.set_cell(6, 6, CellValue::Empty);

        assert_eq!(
            sheet.used_range(),
            Some(UsedRange {
                first_row: 2,
                first_col: 1,
                last_row: 4,
                last_col: 3,
            })
        );
        assert_eq!(sheet.used_range().unwrap().reference(), "B3:D5");
    }

    #[test]
    fn test_sheet_names_unique_case_insensitive() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("People").unwrap();
        assert!(matches!(
            workbook.add_sheet("people"),
            Err(SheetsmithError::SheetExists(_))
        ));
        assert!(workbook.sheet("PEOPLE").is_some());
    }

    #[test]
    fn test_invalid_sheet_names() {
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("   ").is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
        assert!(validate_sheet_name("Q1 Sales").is_ok());
    }

    #[test]
    fn test_select_by_index_and_name() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("First").unwrap();
        workbook.add_sheet("Second").unwrap();

        assert_eq!(workbook.select(&SheetSelector::Index(1)).unwrap().name(), "Second");
        assert_eq!(workbook.select(&"First".into()).unwrap().name(), "First");
        assert!(matches!(
            workbook.select(&SheetSelector::Index(5)),
            Err(SheetsmithError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn test_excel_serial() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(excel_serial(&date.and_time(NaiveTime::MIN)), 45292.0);
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(excel_serial(&noon), 45292.5);
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(30)), CellValue::Number(30.0));
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2024-03-15".to_string())),
            CellValue::from(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(
            cell_from_data(&Data::String("Alice".to_string())),
            CellValue::from("Alice")
        );
    }

    #[test]
    fn test_header_trims_names() {
        let mut sheet = Sheet::new("S");
        sheet.set_cell(0, 0, CellValue::from(" Name "));
        sheet.set_cell(0, 2, CellValue::Number(2024.0));
        sheet.set_cell(1, 0, CellValue::from("Alice"));
        assert_eq!(
            sheet.header(),
            vec![(0, "Name".to_string()), (2, "2024".to_string())]
        );
    }
}
